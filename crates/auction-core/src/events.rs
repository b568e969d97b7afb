//! Auction events and the append-only call journal
//!
//! Each engine call returns the events it emitted inside its
//! [`Receipt`](crate::engine::Receipt). The same events are mirrored into the
//! engine's [`Journal`] together with the post-call state digest, so external
//! monitors can replay the auction without touching engine internals.

use serde::{Deserialize, Serialize};

use crate::Address;

/// Auction opened for bidding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub owner: Address,
    pub asset_custodian: Address,
    pub asset_id: u64,
    pub bid_increment: u64,
    pub start_block: u64,
    pub end_block: u64,
}

/// A bid was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidEvent {
    /// Account that placed the bid
    pub bidder: Address,
    /// Bidder's total escrow after this bid
    pub bid: u64,
    pub highest_bidder: Address,
    pub highest_bid: u64,
    pub highest_binding_bid: u64,
}

/// Owner cancelled the auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelEvent {
    pub owner: Address,
}

/// Auction closed and the asset was released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeEvent {
    /// Receiver of the asset; the owner when nobody bid
    pub winner: Address,
    /// Highest binding bid owed to the owner
    pub price: u64,
}

/// Funds left escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    /// Caller that received the funds
    pub withdrawer: Address,
    /// Escrow entry the funds were drawn from
    pub withdrawal_account: Address,
    pub amount: u64,
}

/// Tagged auction event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum AuctionEvent {
    LogStart(StartEvent),
    LogBid(BidEvent),
    LogCanceled(CancelEvent),
    LogFinalized(FinalizeEvent),
    LogWithdrawal(WithdrawalEvent),
}

impl AuctionEvent {
    pub fn bid(
        bidder: Address,
        bid: u64,
        highest_bidder: Address,
        highest_bid: u64,
        highest_binding_bid: u64,
    ) -> Self {
        Self::LogBid(BidEvent {
            bidder,
            bid,
            highest_bidder,
            highest_bid,
            highest_binding_bid,
        })
    }

    pub fn withdrawal(withdrawer: Address, withdrawal_account: Address, amount: u64) -> Self {
        Self::LogWithdrawal(WithdrawalEvent {
            withdrawer,
            withdrawal_account,
            amount,
        })
    }

    /// Event name as it appears in the serialized `event` tag
    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::LogStart(_) => "LogStart",
            AuctionEvent::LogBid(_) => "LogBid",
            AuctionEvent::LogCanceled(_) => "LogCanceled",
            AuctionEvent::LogFinalized(_) => "LogFinalized",
            AuctionEvent::LogWithdrawal(_) => "LogWithdrawal",
        }
    }
}

// ── Journal ───────────────────────────────────────────────

/// One committed engine call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Sequential call number (0-indexed)
    pub sequence: u64,
    /// Name of the engine call
    pub call: String,
    pub caller: Address,
    pub block_height: u64,
    pub events: Vec<AuctionEvent>,
    /// SHA-256 of the auction record after the call
    pub state_digest: String,
}

/// Append-only journal of committed calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn next_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All events in commit order
    pub fn events(&self) -> impl Iterator<Item = &AuctionEvent> {
        self.entries.iter().flat_map(|e| e.events.iter())
    }
}
