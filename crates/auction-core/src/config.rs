//! Engine and genesis configuration
//!
//! A genesis config describes the world an engine starts in: who owns the
//! auction, the engine's own ledger account, initial balances and
//! approvals, and which assets the custodian already holds.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::AuctionEngine;
use crate::ledger::{InMemoryCustody, InMemoryLedger};
use crate::{Address, Error, Result};

/// Fixed identity of one engine instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Account allowed to start and cancel the auction
    pub owner: Address,
    /// The engine's own account at the fungible ledger and custodian
    pub address: Address,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            return Err(Error::Config("engine owner cannot be the zero address".into()));
        }
        if self.address.is_zero() {
            return Err(Error::Config("engine address cannot be the zero address".into()));
        }
        if self.owner == self.address {
            return Err(Error::Config("engine address must differ from the owner".into()));
        }
        Ok(())
    }
}

/// A pre-approved spending allowance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceConfig {
    pub owner: Address,
    pub spender: Address,
    pub amount: u64,
}

/// An asset already registered with a custodian.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfig {
    pub custodian: Address,
    pub asset_id: u64,
    pub holder: Address,
}

/// Initial world state for an engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub engine: EngineConfig,

    /// Opening ledger balances
    #[serde(default)]
    pub balances: BTreeMap<Address, u64>,

    #[serde(default)]
    pub allowances: Vec<AllowanceConfig>,

    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

impl GenesisConfig {
    /// Genesis with no balances, approvals or assets.
    pub fn new(owner: Address, address: Address) -> Self {
        Self {
            engine: EngineConfig { owner, address },
            balances: BTreeMap::new(),
            allowances: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid genesis JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;

        if self.balances.keys().any(Address::is_zero) {
            return Err(Error::Config("balance assigned to the zero address".into()));
        }

        for asset in &self.assets {
            if asset.custodian.is_zero() || asset.holder.is_zero() {
                return Err(Error::Config(format!(
                    "asset {} has a zero custodian or holder",
                    asset.asset_id
                )));
            }
        }

        Ok(())
    }

    pub fn build_ledger(&self) -> Result<InMemoryLedger> {
        let mut ledger = InMemoryLedger::new();
        for (who, amount) in &self.balances {
            ledger.mint(*who, *amount)?;
        }
        for allowance in &self.allowances {
            ledger.approve(allowance.owner, allowance.spender, allowance.amount);
        }
        Ok(ledger)
    }

    pub fn build_custody(&self) -> InMemoryCustody {
        let mut custody = InMemoryCustody::new();
        for asset in &self.assets {
            custody.deposit(asset.custodian, asset.asset_id, asset.holder);
        }
        custody
    }

    /// Build an engine over in-memory collaborators seeded from this genesis.
    pub fn build_engine(&self) -> Result<AuctionEngine<InMemoryLedger, InMemoryCustody>> {
        self.validate()?;
        Ok(AuctionEngine::new(
            self.engine.clone(),
            self.build_ledger()?,
            self.build_custody(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AssetCustody, FungibleLedger};

    const OWNER: Address = Address::from_low_u8(1);
    const ENGINE: Address = Address::from_low_u8(0xa0);
    const NFT: Address = Address::from_low_u8(0xee);

    #[test]
    fn test_engine_config_validation() {
        let ok = EngineConfig {
            owner: OWNER,
            address: ENGINE,
        };
        assert!(ok.validate().is_ok());

        let same = EngineConfig {
            owner: OWNER,
            address: OWNER,
        };
        assert!(matches!(same.validate(), Err(Error::Config(_))));

        let zero = EngineConfig {
            owner: Address::ZERO,
            address: ENGINE,
        };
        assert!(matches!(zero.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_genesis_from_json() {
        let json = r#"{
            "engine": {
                "owner": "0x0000000000000000000000000000000000000001",
                "address": "0x00000000000000000000000000000000000000a0"
            },
            "balances": { "0x0000000000000000000000000000000000000002": 1000 },
            "allowances": [{
                "owner": "0x0000000000000000000000000000000000000002",
                "spender": "0x00000000000000000000000000000000000000a0",
                "amount": 666
            }],
            "assets": [{
                "custodian": "0x00000000000000000000000000000000000000ee",
                "assetId": 666,
                "holder": "0x00000000000000000000000000000000000000a0"
            }]
        }"#;
        let genesis = GenesisConfig::from_json(json).unwrap();
        let ledger = genesis.build_ledger().unwrap();
        let bidder = Address::from_low_u8(2);
        assert_eq!(ledger.balance_of(&bidder), 1000);
        assert_eq!(ledger.allowance(&bidder, &ENGINE), 666);
        assert_eq!(genesis.build_custody().holder_of(&NFT, 666), Some(ENGINE));
    }

    #[test]
    fn test_genesis_rejects_zero_holder() {
        let mut genesis = GenesisConfig::new(OWNER, ENGINE);
        genesis.assets.push(AssetConfig {
            custodian: NFT,
            asset_id: 1,
            holder: Address::ZERO,
        });
        assert!(matches!(genesis.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_genesis_rejects_malformed_json() {
        assert!(matches!(
            GenesisConfig::from_json("{\"engine\": 3}"),
            Err(Error::Config(_))
        ));
    }
}
