//! Auction engine: the binding-bid state machine
//!
//! The engine holds one asset for sale and escrows every bidder's funds
//! until the auction is cancelled or finalized. Each call:
//!
//! 1. Validates the caller and arguments against the current state
//! 2. Computes the next `Auction` record on a copy
//! 3. Checks the state invariants on that copy
//! 4. Performs the external effect (ledger or custody call)
//! 5. Commits the copy and journals the emitted events
//!
//! Any failure in steps 1–4 returns before step 5, so the live record is
//! never partially updated.
//!
//! # Binding bids
//!
//! A bidder's escrow accumulates across calls. The *highest bid* is the
//! leader's total escrow; the *highest binding bid* is what the leader
//! would actually pay, which is at most one increment above the runner-up.

use std::cmp::min;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::events::{AuctionEvent, CancelEvent, FinalizeEvent, Journal, JournalEntry, StartEvent};
use crate::ledger::{AssetCustody, FungibleLedger};
use crate::{Address, Error, Result};

// ── Core Types ────────────────────────────────────────────

/// Lifecycle of an auction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionState {
    #[default]
    Uninitialized,
    Active,
    Cancelled,
    Finalized,
}

impl AuctionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionState::Cancelled | AuctionState::Finalized)
    }

    fn rank(&self) -> u8 {
        match self {
            AuctionState::Uninitialized => 0,
            AuctionState::Active => 1,
            AuctionState::Cancelled | AuctionState::Finalized => 2,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            AuctionState::Uninitialized => 0,
            AuctionState::Active => 1,
            AuctionState::Cancelled => 2,
            AuctionState::Finalized => 3,
        }
    }
}

/// The auction record owned by one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub state: AuctionState,
    pub bid_increment: u64,
    /// Auction lifetime in blocks
    pub duration: u64,
    pub asset_id: u64,
    pub asset_custodian: Address,
    pub start_block: u64,
    /// First block at which bidding is closed
    pub end_block: u64,
    pub highest_bidder: Option<Address>,
    pub highest_bid: u64,
    pub highest_binding_bid: u64,
    /// Escrowed funds per bidder
    pub funds_by_bidder: BTreeMap<Address, u64>,
    pub owner_has_withdrawn: bool,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
}

impl Auction {
    pub fn funds_of(&self, who: &Address) -> u64 {
        self.funds_by_bidder.get(who).copied().unwrap_or(0)
    }

    /// Sum of all escrow entries
    pub fn escrow_total(&self) -> u64 {
        self.funds_by_bidder.values().sum()
    }

    /// Bidding is open at `block_height`
    pub fn is_open(&self, block_height: u64) -> bool {
        self.state == AuctionState::Active && block_height < self.end_block
    }

    /// SHA-256 over a canonical byte encoding of the record.
    ///
    /// Field order is fixed and the escrow map iterates in key order, so equal
    /// records always hash equally.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update([self.state.tag()]);
        hasher.update(self.bid_increment.to_be_bytes());
        hasher.update(self.duration.to_be_bytes());
        hasher.update(self.asset_id.to_be_bytes());
        hasher.update(self.asset_custodian.as_bytes());
        hasher.update(self.start_block.to_be_bytes());
        hasher.update(self.end_block.to_be_bytes());
        match &self.highest_bidder {
            Some(addr) => {
                hasher.update([1u8]);
                hasher.update(addr.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.highest_bid.to_be_bytes());
        hasher.update(self.highest_binding_bid.to_be_bytes());
        hasher.update((self.funds_by_bidder.len() as u64).to_be_bytes());
        for (who, amount) in &self.funds_by_bidder {
            hasher.update(who.as_bytes());
            hasher.update(amount.to_be_bytes());
        }
        hasher.update([self.owner_has_withdrawn as u8]);
        hasher.update(self.total_deposited.to_be_bytes());
        hasher.update(self.total_withdrawn.to_be_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Evaluate all record invariants, collecting every violation
    pub fn check_invariants(&self) -> std::result::Result<(), Vec<String>> {
        let mut violations = Vec::new();

        if self.highest_binding_bid > self.highest_bid {
            violations.push(format!(
                "highest binding bid {} exceeds highest bid {}",
                self.highest_binding_bid, self.highest_bid
            ));
        }

        if self.state == AuctionState::Active {
            if let Some(leader) = &self.highest_bidder {
                if self.funds_of(leader) < self.highest_bid {
                    violations.push(format!(
                        "leader {} escrows {} below highest bid {}",
                        leader,
                        self.funds_of(leader),
                        self.highest_bid
                    ));
                }
            }
        }

        let held = self.escrow_total();
        match self.total_deposited.checked_sub(self.total_withdrawn) {
            Some(expected) if expected == held => {}
            _ => violations.push(format!(
                "escrow {} does not match deposits {} minus withdrawals {}",
                held, self.total_deposited, self.total_withdrawn
            )),
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Explicit caller identity and clock for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallContext {
    /// Authenticated account making the call
    pub caller: Address,
    /// Current block height
    pub block_height: u64,
}

impl CallContext {
    pub fn new(caller: Address, block_height: u64) -> Self {
        Self {
            caller,
            block_height,
        }
    }
}

/// Outcome of a committed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T = ()> {
    pub value: T,
    pub events: Vec<AuctionEvent>,
}

// ── Engine ────────────────────────────────────────────────

/// Per-auction state machine over an external ledger and custodian
pub struct AuctionEngine<L, C> {
    config: EngineConfig,
    auction: Auction,
    ledger: L,
    custody: C,
    journal: Journal,
}

impl<L: FungibleLedger, C: AssetCustody> AuctionEngine<L, C> {
    /// Create an engine in the Uninitialized state
    pub fn new(config: EngineConfig, ledger: L, custody: C) -> Self {
        Self {
            config,
            auction: Auction::default(),
            ledger,
            custody,
            journal: Journal::new(),
        }
    }

    /// Open the auction. Only the owner may call this, once.
    pub fn start_auction(
        &mut self,
        ctx: &CallContext,
        bid_increment: u64,
        duration: u64,
        asset_id: u64,
        asset_custodian: Address,
    ) -> Result<Receipt> {
        self.try_start(ctx, bid_increment, duration, asset_id, asset_custodian)
            .inspect_err(|e| Self::log_rejection("start_auction", ctx, e))
    }

    fn try_start(
        &mut self,
        ctx: &CallContext,
        bid_increment: u64,
        duration: u64,
        asset_id: u64,
        asset_custodian: Address,
    ) -> Result<Receipt> {
        if asset_custodian.is_zero() {
            return Err(Error::InvalidAddress);
        }
        if ctx.caller != self.config.owner {
            return Err(Error::NotOwner);
        }
        if self.auction.state != AuctionState::Uninitialized {
            return Err(Error::AlreadyStarted);
        }
        if bid_increment == 0 {
            return Err(Error::InvalidParameter("bid increment must be positive"));
        }
        if duration == 0 {
            return Err(Error::InvalidParameter("duration must be positive"));
        }
        let end_block = ctx
            .block_height
            .checked_add(duration)
            .ok_or(Error::Overflow)?;
        if self.custody.holder_of(&asset_custodian, asset_id) != Some(self.config.address) {
            return Err(Error::AssetNotHeld);
        }

        let mut next = self.auction.clone();
        next.state = AuctionState::Active;
        next.bid_increment = bid_increment;
        next.duration = duration;
        next.asset_id = asset_id;
        next.asset_custodian = asset_custodian;
        next.start_block = ctx.block_height;
        next.end_block = end_block;
        self.verify_transition(&next)?;

        let event = AuctionEvent::LogStart(StartEvent {
            owner: self.config.owner,
            asset_custodian,
            asset_id,
            bid_increment,
            start_block: ctx.block_height,
            end_block,
        });
        Ok(self.commit("start_auction", ctx, next, (), vec![event]))
    }

    /// Add `amount` to the caller's escrow and re-rank the bids.
    pub fn place_bid(&mut self, ctx: &CallContext, amount: u64) -> Result<Receipt> {
        self.try_place_bid(ctx, amount)
            .inspect_err(|e| Self::log_rejection("place_bid", ctx, e))
    }

    fn try_place_bid(&mut self, ctx: &CallContext, amount: u64) -> Result<Receipt> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let current = &self.auction;
        if !current.is_open(ctx.block_height) {
            return Err(Error::AuctionNotActive);
        }
        if ctx.caller == self.config.owner {
            return Err(Error::OwnerCannotBid);
        }

        let bidder = ctx.caller;
        let new_total = current
            .funds_of(&bidder)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        if new_total <= current.highest_binding_bid {
            return Err(Error::InsufficientBid);
        }

        let mut next = current.clone();
        next.funds_by_bidder.insert(bidder, new_total);
        next.total_deposited = current
            .total_deposited
            .checked_add(amount)
            .ok_or(Error::Overflow)?;

        let ceiling = current.highest_bid.saturating_add(current.bid_increment);
        let leader = match current.highest_bidder {
            // Raising your own lead leaves the binding bid where it is
            Some(leader) if leader == bidder => {
                next.highest_bid = new_total;
                leader
            }
            Some(leader) if new_total <= current.highest_bid => {
                next.highest_binding_bid = min(new_total, ceiling);
                leader
            }
            _ => {
                next.highest_binding_bid = min(new_total, ceiling);
                next.highest_bid = new_total;
                bidder
            }
        };
        next.highest_bidder = Some(leader);
        debug!(
            bidder = %bidder,
            total = new_total,
            leader = %leader,
            highest_bid = next.highest_bid,
            highest_binding_bid = next.highest_binding_bid,
            "bid ranked"
        );
        self.verify_transition(&next)?;

        let engine = self.config.address;
        self.ledger
            .transfer_from(&engine, &bidder, &engine, amount)?;

        let event = AuctionEvent::bid(
            bidder,
            new_total,
            leader,
            next.highest_bid,
            next.highest_binding_bid,
        );
        Ok(self.commit("place_bid", ctx, next, (), vec![event]))
    }

    /// Stop the auction early. Funds stay in escrow until withdrawn.
    pub fn cancel_auction(&mut self, ctx: &CallContext) -> Result<Receipt> {
        self.try_cancel(ctx)
            .inspect_err(|e| Self::log_rejection("cancel_auction", ctx, e))
    }

    fn try_cancel(&mut self, ctx: &CallContext) -> Result<Receipt> {
        if ctx.caller != self.config.owner {
            return Err(Error::NotOwner);
        }
        // An auction past its end block can only be finalized
        if !self.auction.is_open(ctx.block_height) {
            return Err(Error::InvalidState);
        }

        let mut next = self.auction.clone();
        next.state = AuctionState::Cancelled;
        self.verify_transition(&next)?;

        let event = AuctionEvent::LogCanceled(CancelEvent {
            owner: self.config.owner,
        });
        Ok(self.commit("cancel_auction", ctx, next, (), vec![event]))
    }

    /// Close an expired auction and hand the asset to the leader,
    /// or back to the owner when nobody bid. Anyone may call this.
    pub fn finalize(&mut self, ctx: &CallContext) -> Result<Receipt> {
        self.try_finalize(ctx)
            .inspect_err(|e| Self::log_rejection("finalize", ctx, e))
    }

    fn try_finalize(&mut self, ctx: &CallContext) -> Result<Receipt> {
        if self.auction.state != AuctionState::Active {
            return Err(Error::InvalidState);
        }
        if ctx.block_height < self.auction.end_block {
            return Err(Error::AuctionNotEnded);
        }

        let winner = self.auction.highest_bidder.unwrap_or(self.config.owner);
        let price = self.auction.highest_binding_bid;
        let mut next = self.auction.clone();
        next.state = AuctionState::Finalized;
        self.verify_transition(&next)?;

        self.custody.transfer_asset(
            &next.asset_custodian,
            next.asset_id,
            &self.config.address,
            &winner,
        )?;

        let event = AuctionEvent::LogFinalized(FinalizeEvent { winner, price });
        Ok(self.commit("finalize", ctx, next, (), vec![event]))
    }

    /// Pay out whatever the caller is owed. Returns the amount paid;
    /// a caller with nothing owed gets 0 and no event.
    pub fn withdraw(&mut self, ctx: &CallContext) -> Result<Receipt<u64>> {
        self.try_withdraw(ctx)
            .inspect_err(|e| Self::log_rejection("withdraw", ctx, e))
    }

    fn try_withdraw(&mut self, ctx: &CallContext) -> Result<Receipt<u64>> {
        let current = &self.auction;
        let caller = ctx.caller;
        let is_owner = caller == self.config.owner;

        let (account, amount) = match current.state {
            AuctionState::Cancelled => (caller, current.funds_of(&caller)),
            AuctionState::Finalized if is_owner => match current.highest_bidder {
                Some(leader) if !current.owner_has_withdrawn => {
                    (leader, current.highest_binding_bid)
                }
                _ => (caller, 0),
            },
            AuctionState::Finalized if current.highest_bidder == Some(caller) => {
                let escrow = current.funds_of(&caller);
                if current.owner_has_withdrawn {
                    (caller, escrow)
                } else {
                    (caller, escrow.saturating_sub(current.highest_binding_bid))
                }
            }
            AuctionState::Finalized => (caller, current.funds_of(&caller)),
            AuctionState::Uninitialized | AuctionState::Active => {
                return Err(Error::InvalidState)
            }
        };

        if amount == 0 {
            let next = current.clone();
            return Ok(self.commit("withdraw", ctx, next, 0, Vec::new()));
        }

        let mut next = current.clone();
        let remaining = current
            .funds_of(&account)
            .checked_sub(amount)
            .ok_or(Error::Overflow)?;
        next.funds_by_bidder.insert(account, remaining);
        next.total_withdrawn = current
            .total_withdrawn
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        if is_owner && current.state == AuctionState::Finalized {
            next.owner_has_withdrawn = true;
        }
        self.verify_transition(&next)?;

        let engine = self.config.address;
        self.ledger.transfer(&engine, &caller, amount)?;

        let event = AuctionEvent::withdrawal(caller, account, amount);
        Ok(self.commit("withdraw", ctx, next, amount, vec![event]))
    }

    // ── Transition plumbing ───────────────────────────────

    /// Reject a candidate record that breaks an invariant, moves the
    /// lifecycle backwards, or alters fixed auction parameters.
    fn verify_transition(&self, next: &Auction) -> Result<()> {
        let current = &self.auction;

        if next.state.rank() < current.state.rank()
            || (current.state.is_terminal() && next.state != current.state)
        {
            return Err(Error::InvariantViolation(format!(
                "illegal transition {:?} -> {:?}",
                current.state, next.state
            )));
        }

        if current.state != AuctionState::Uninitialized
            && (next.bid_increment != current.bid_increment
                || next.duration != current.duration
                || next.asset_id != current.asset_id
                || next.asset_custodian != current.asset_custodian)
        {
            return Err(Error::InvariantViolation(
                "auction parameters are immutable once started".into(),
            ));
        }

        next.check_invariants()
            .map_err(|violations| Error::InvariantViolation(violations.join(", ")))
    }

    fn commit<T>(
        &mut self,
        call: &str,
        ctx: &CallContext,
        next: Auction,
        value: T,
        events: Vec<AuctionEvent>,
    ) -> Receipt<T> {
        self.auction = next;
        let state_digest = self.auction.digest();
        let entry = JournalEntry {
            sequence: self.journal.next_sequence(),
            call: call.to_string(),
            caller: ctx.caller,
            block_height: ctx.block_height,
            events: events.clone(),
            state_digest,
        };
        info!(
            call,
            sequence = entry.sequence,
            caller = %ctx.caller,
            block = ctx.block_height,
            state = ?self.auction.state,
            events = events.len(),
            "auction call committed"
        );
        self.journal.append(entry);
        Receipt { value, events }
    }

    fn log_rejection(call: &str, ctx: &CallContext, err: &Error) {
        warn!(
            call,
            caller = %ctx.caller,
            block = ctx.block_height,
            error = %err,
            "auction call rejected"
        );
    }

    // ── Accessors ─────────────────────────────────────────

    pub fn owner(&self) -> Address {
        self.config.owner
    }

    /// The engine's own account at the ledger and custodian
    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    pub fn state(&self) -> AuctionState {
        self.auction.state
    }

    pub fn bid_increment(&self) -> u64 {
        self.auction.bid_increment
    }

    pub fn duration(&self) -> u64 {
        self.auction.duration
    }

    pub fn asset_id(&self) -> u64 {
        self.auction.asset_id
    }

    pub fn asset_custodian(&self) -> Address {
        self.auction.asset_custodian
    }

    pub fn highest_bidder(&self) -> Option<Address> {
        self.auction.highest_bidder
    }

    pub fn highest_bid(&self) -> u64 {
        self.auction.highest_bid
    }

    pub fn highest_binding_bid(&self) -> u64 {
        self.auction.highest_binding_bid
    }

    pub fn funds_of(&self, who: &Address) -> u64 {
        self.auction.funds_of(who)
    }

    pub fn escrow_total(&self) -> u64 {
        self.auction.escrow_total()
    }

    pub fn state_digest(&self) -> String {
        self.auction.digest()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Ledger access for actions outside the auction, such as approvals
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }
}

// ── Tests ─────────────────────────────────────────────────
