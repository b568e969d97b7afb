//! Error types for the auction engine
//!
//! All fallible operations return `Result<T, Error>`.
//! Every variant is raised before any state is committed, so a failed call
//! leaves the engine exactly as it was.

use thiserror::Error;

/// Failures reported by a [`FungibleLedger`](crate::ledger::FungibleLedger).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("insufficient allowance: need {required}, approved {approved}")]
    InsufficientAllowance { required: u64, approved: u64 },

    #[error("transfer to the zero address")]
    ZeroAddress,

    #[error("balance overflow")]
    Overflow,
}

/// Failures reported by an [`AssetCustody`](crate::ledger::AssetCustody).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("unknown asset {asset_id}")]
    UnknownAsset { asset_id: u64 },

    #[error("asset {asset_id} is not held by the sender")]
    NotHolder { asset_id: u64 },

    #[error("transfer to the zero address")]
    ZeroAddress,
}

/// Auction engine error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Asset custodian reference is the zero address
    #[error("Address can't be 0")]
    InvalidAddress,

    /// Caller is not the auction owner
    #[error("Auction: caller is not the owner")]
    NotOwner,

    /// `start_auction` called on an auction that already left Uninitialized
    #[error("Auction: already started")]
    AlreadyStarted,

    /// Start parameter out of range
    #[error("Auction: invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Bid of zero
    #[error("Auction: Amount == 0")]
    ZeroAmount,

    /// Bidder's total does not exceed the highest binding bid
    #[error("Auction: amount is not enough")]
    InsufficientBid,

    /// Bidding attempted outside of the Active window
    #[error("Auction: auction is not active")]
    AuctionNotActive,

    /// Operation not permitted in the current lifecycle state
    #[error("incorrect auction state")]
    InvalidState,

    /// The owner may not bid on their own lot
    #[error("Auction: owner cannot bid")]
    OwnerCannotBid,

    /// Finalization requested before the end block
    #[error("Auction: auction has not ended yet")]
    AuctionNotEnded,

    /// The custody collaborator does not hold the asset for this engine
    #[error("Auction: asset is not held by the auction")]
    AssetNotHeld,

    /// Checked arithmetic overflowed
    #[error("Auction: amount overflow")]
    Overflow,

    /// A state invariant would not hold after the call
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// The fungible ledger rejected a transfer
    #[error("Ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// The custody collaborator rejected an asset transfer
    #[error("Custody: {0}")]
    Custody(#[from] CustodyError),

    /// Genesis or engine configuration is unusable
    #[error("Config error: {0}")]
    Config(String),

    /// Scenario file is malformed
    #[error("Scenario error: {0}")]
    Scenario(String),
}

impl Error {
    /// Stable name of the variant, used by scenario expectations
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidAddress => "InvalidAddress",
            Error::NotOwner => "NotOwner",
            Error::AlreadyStarted => "AlreadyStarted",
            Error::InvalidParameter(_) => "InvalidParameter",
            Error::ZeroAmount => "ZeroAmount",
            Error::InsufficientBid => "InsufficientBid",
            Error::AuctionNotActive => "AuctionNotActive",
            Error::InvalidState => "InvalidState",
            Error::OwnerCannotBid => "OwnerCannotBid",
            Error::AuctionNotEnded => "AuctionNotEnded",
            Error::AssetNotHeld => "AssetNotHeld",
            Error::Overflow => "Overflow",
            Error::InvariantViolation(_) => "InvariantViolation",
            Error::Ledger(_) => "Ledger",
            Error::Custody(_) => "Custody",
            Error::Config(_) => "Config",
            Error::Scenario(_) => "Scenario",
        }
    }
}

/// Result type alias for auction operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_known_reverts() {
        assert_eq!(Error::InvalidAddress.to_string(), "Address can't be 0");
        assert_eq!(Error::ZeroAmount.to_string(), "Auction: Amount == 0");
        assert_eq!(
            Error::InsufficientBid.to_string(),
            "Auction: amount is not enough"
        );
        assert_eq!(Error::InvalidState.to_string(), "incorrect auction state");
    }

    #[test]
    fn test_ledger_error_converts() {
        let err: Error = LedgerError::InsufficientAllowance {
            required: 666,
            approved: 665,
        }
        .into();
        assert_eq!(err.kind(), "Ledger");
        assert!(err.to_string().contains("approved 665"));
    }
}
