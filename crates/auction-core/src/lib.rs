//! Auction Core - binding-bid auction engine
//!
//! A per-auction state machine that holds one asset for sale, accepts
//! incremental bids, escrows bidder funds and resolves to a payout or
//! refund. Token movement and asset custody are external collaborators
//! reached through the traits in [`ledger`].
//!
//! # Architecture
//!
//! ```text
//! Genesis → AuctionEngine ──start_auction──▶ Active
//!              │                               │ place_bid (repeated)
//!              │                               ▼
//!              │                 cancel_auction │ finalize
//!              │                               ▼
//!              └──────── withdraw ◀── Cancelled / Finalized
//!                  │
//!                  ├─▶ FungibleLedger (escrow in / payout out)
//!                  └─▶ AssetCustody   (asset release on finalize)
//! ```
//!
//! # Guarantees
//!
//! - **Atomic**: a failed call leaves state unchanged
//! - **Deterministic**: same calls in the same order produce the same state digest
//! - **Conserving**: escrow held never exceeds deposits minus withdrawals

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod scenario;

pub use config::{EngineConfig, GenesisConfig};
pub use engine::{Auction, AuctionEngine, AuctionState, CallContext, Receipt};
pub use error::{CustodyError, Error, LedgerError, Result};
pub use events::{AuctionEvent, Journal, JournalEntry};
pub use ledger::{AssetCustody, FungibleLedger, InMemoryCustody, InMemoryLedger};

use std::fmt;
use std::str::FromStr;

/// A 20-byte account identity.
///
/// Text form is `0x` followed by 40 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null reference
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build an address whose last byte is `n`; handy for tests and fixtures.
    pub const fn from_low_u8(n: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Config(format!(
                "address '{}' must have 40 hex digits",
                s
            )));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::Config(format!("address '{}' is not valid hex", s)))?;
        }
        Ok(Address(bytes))
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_text_roundtrip() {
        let addr = Address::from_low_u8(0xab);
        let text = addr.to_string();
        assert_eq!(text, "0x00000000000000000000000000000000000000ab");
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz00000000000000000000000000000000000000"
            .parse::<Address>()
            .is_err());
        // Sign characters are not hex digits
        assert!("0x+f00000000000000000000000000000000000000"
            .parse::<Address>()
            .is_err());
        assert!("+f+f0000000000000000000000000000000000ab"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u8(1).is_zero());
        let zero: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_zero());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::from_low_u8(7);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000007\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
