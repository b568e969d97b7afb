//! External collaborators: the fungible ledger and the asset custodian
//!
//! The engine never owns token balances or assets directly. It escrows
//! bids by pulling approved funds into its own ledger account, pays them
//! back out on withdrawal, and asks the custodian to release the asset on
//! finalize. The in-memory implementations here back the scenario runner
//! and the test suite.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CustodyError, LedgerError};
use crate::Address;

/// Balance ledger for the bidding currency.
pub trait FungibleLedger {
    /// Current balance of `who`
    fn balance_of(&self, who: &Address) -> u64;

    /// Move `amount` from `from` to `to` on behalf of `spender`,
    /// consuming `from`'s allowance for `spender`.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Move `amount` out of `from`'s own balance.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError>;
}

/// Holder registry for non-fungible assets, keyed by custodian and asset id.
pub trait AssetCustody {
    /// Who currently holds `asset_id` at `custodian`, if it exists
    fn holder_of(&self, custodian: &Address, asset_id: u64) -> Option<Address>;

    /// Move the asset from `from` to `to`; `from` must be the current holder.
    fn transfer_asset(
        &mut self,
        custodian: &Address,
        asset_id: u64,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError>;
}

// ── In-memory ledger ──────────────────────────────────────

/// Allowance-based fungible ledger held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    balances: BTreeMap<Address, u64>,
    /// owner → spender → remaining allowance
    allowances: BTreeMap<Address, BTreeMap<Address, u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `to` out of thin air.
    pub fn mint(&mut self, to: Address, amount: u64) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s funds, replacing any previous value.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u64) {
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if from == to {
            return Ok(());
        }
        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl FungibleLedger for InMemoryLedger {
    fn balance_of(&self, who: &Address) -> u64 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let approved = self.allowance(from, spender);
        if approved < amount {
            return Err(LedgerError::InsufficientAllowance {
                required: amount,
                approved,
            });
        }
        self.move_balance(from, to, amount)?;
        self.approve(*from, *spender, approved - amount);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        self.move_balance(from, to, amount)
    }
}

// ── In-memory custody ─────────────────────────────────────

/// Asset holder registry held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryCustody {
    /// custodian → asset id → holder
    holders: BTreeMap<Address, BTreeMap<u64, Address>>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `asset_id` at `custodian` as held by `holder`.
    pub fn deposit(&mut self, custodian: Address, asset_id: u64, holder: Address) {
        self.holders
            .entry(custodian)
            .or_default()
            .insert(asset_id, holder);
    }
}

impl AssetCustody for InMemoryCustody {
    fn holder_of(&self, custodian: &Address, asset_id: u64) -> Option<Address> {
        self.holders
            .get(custodian)
            .and_then(|assets| assets.get(&asset_id))
            .copied()
    }

    fn transfer_asset(
        &mut self,
        custodian: &Address,
        asset_id: u64,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError> {
        if to.is_zero() {
            return Err(CustodyError::ZeroAddress);
        }
        let holder = self
            .holders
            .get_mut(custodian)
            .and_then(|assets| assets.get_mut(&asset_id))
            .ok_or(CustodyError::UnknownAsset { asset_id })?;
        if holder != from {
            return Err(CustodyError::NotHolder { asset_id });
        }
        *holder = *to;
        Ok(())
    }
}
