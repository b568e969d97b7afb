//! Scenario runner for scripted sequences of calls
//!
//! A scenario pairs a [`GenesisConfig`] with a list of steps. Each step
//! names a caller, a block height, a call and optionally the outcome it
//! expects (`"ok"` or an error kind such as `"InvalidState"`). The runner
//! executes every step against a fresh engine and reports per-step results
//! plus the final state and journal.
//!
//! # Determinism
//!
//! No I/O, randomness or wall-clock time is involved: the same scenario
//! always yields the same report.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GenesisConfig;
use crate::engine::{Auction, CallContext};
use crate::events::{AuctionEvent, Journal};
use crate::ledger::InMemoryLedger;
use crate::{Address, Error, Result};

/// One call in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Call {
    StartAuction {
        #[serde(rename = "bidIncrement")]
        bid_increment: u64,
        duration: u64,
        #[serde(rename = "assetId")]
        asset_id: u64,
        #[serde(rename = "assetCustodian")]
        asset_custodian: Address,
    },
    PlaceBid {
        amount: u64,
    },
    CancelAuction,
    Finalize,
    Withdraw,
    /// Ledger-level approval; the spender defaults to the engine
    Approve {
        #[serde(default)]
        spender: Option<Address>,
        amount: u64,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::StartAuction { .. } => "startAuction",
            Call::PlaceBid { .. } => "placeBid",
            Call::CancelAuction => "cancelAuction",
            Call::Finalize => "finalize",
            Call::Withdraw => "withdraw",
            Call::Approve { .. } => "approve",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub caller: Address,
    #[serde(default)]
    pub block: u64,
    pub call: Call,
    /// `"ok"` or an error kind; omitted means "ok"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub genesis: GenesisConfig,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)
            .map_err(|e| Error::Scenario(format!("invalid scenario JSON: {}", e)))?;
        scenario.genesis.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Scenario(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}

// ── Report ────────────────────────────────────────────────

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub op: String,
    pub caller: Address,
    pub block: u64,
    pub success: bool,
    /// Amount paid out, for withdrawals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    pub events: Vec<AuctionEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Outcome matched the step's expectation
    pub matched: bool,
}

/// Result of a whole scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    /// Every step matched its expectation
    pub success: bool,
    pub steps: Vec<StepOutcome>,
    pub final_state: Auction,
    pub ledger: InMemoryLedger,
    pub journal: Journal,
    pub state_digest: String,
}

impl ScenarioReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.matched)
    }
}

// ── Runner ────────────────────────────────────────────────

/// Run every step of `scenario` against a fresh engine.
///
/// Rejected calls are recorded, not propagated: only a malformed genesis
/// returns `Err`.
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let mut engine = scenario.genesis.build_engine()?;
    let mut outcomes = Vec::with_capacity(scenario.steps.len());

    for (index, step) in scenario.steps.iter().enumerate() {
        let ctx = CallContext::new(step.caller, step.block);

        let result: Result<(Option<u64>, Vec<AuctionEvent>)> = match &step.call {
            Call::StartAuction {
                bid_increment,
                duration,
                asset_id,
                asset_custodian,
            } => engine
                .start_auction(&ctx, *bid_increment, *duration, *asset_id, *asset_custodian)
                .map(|r| (None, r.events)),
            Call::PlaceBid { amount } => engine.place_bid(&ctx, *amount).map(|r| (None, r.events)),
            Call::CancelAuction => engine.cancel_auction(&ctx).map(|r| (None, r.events)),
            Call::Finalize => engine.finalize(&ctx).map(|r| (None, r.events)),
            Call::Withdraw => engine.withdraw(&ctx).map(|r| (Some(r.value), r.events)),
            Call::Approve { spender, amount } => {
                let spender = spender.unwrap_or_else(|| engine.address());
                engine.ledger_mut().approve(step.caller, spender, *amount);
                Ok((None, Vec::new()))
            }
        };

        let expected = step.expect.as_deref().unwrap_or("ok");
        let outcome = match result {
            Ok((value, events)) => StepOutcome {
                index,
                op: step.call.name().to_string(),
                caller: step.caller,
                block: step.block,
                success: true,
                value,
                events,
                error: None,
                error_kind: None,
                matched: expected == "ok",
            },
            Err(e) => StepOutcome {
                index,
                op: step.call.name().to_string(),
                caller: step.caller,
                block: step.block,
                success: false,
                value: None,
                events: Vec::new(),
                error: Some(e.to_string()),
                error_kind: Some(e.kind().to_string()),
                matched: expected == e.kind(),
            },
        };

        if !outcome.matched {
            warn!(
                step = index,
                op = %outcome.op,
                expected,
                got = outcome.error_kind.as_deref().unwrap_or("ok"),
                "scenario step did not match expectation"
            );
        }
        outcomes.push(outcome);
    }

    let success = outcomes.iter().all(|o| o.matched);
    info!(
        steps = outcomes.len(),
        success,
        state = ?engine.state(),
        "scenario finished"
    );

    Ok(ScenarioReport {
        success,
        steps: outcomes,
        final_state: engine.auction().clone(),
        ledger: engine.ledger().clone(),
        journal: engine.journal().clone(),
        state_digest: engine.state_digest(),
    })
}

/// Parse, run and serialize a scenario
///
/// # Returns
/// Pretty-printed JSON of the [`ScenarioReport`]
pub fn run_scenario_json(json: &str) -> Result<String> {
    let scenario = Scenario::from_json(json)?;
    let report = run_scenario(&scenario)?;
    serde_json::to_string_pretty(&report)
        .map_err(|e| Error::Scenario(format!("failed to serialize report: {}", e)))
}

/// Starter scenario used by `init`: a short auction that runs to finalization.
pub fn template(owner: Address, engine: Address, custodian: Address) -> Scenario {
    let bidder_a = Address::from_low_u8(0x0a);
    let bidder_b = Address::from_low_u8(0x0b);
    let mut genesis = GenesisConfig::new(owner, engine);
    genesis.balances.insert(bidder_a, 1000);
    genesis.balances.insert(bidder_b, 1000);
    genesis.assets.push(crate::config::AssetConfig {
        custodian,
        asset_id: 1,
        holder: engine,
    });

    let step = |caller: Address, block: u64, call: Call| Step {
        caller,
        block,
        call,
        expect: None,
    };
    Scenario {
        genesis,
        steps: vec![
            step(
                owner,
                0,
                Call::StartAuction {
                    bid_increment: 10,
                    duration: 100,
                    asset_id: 1,
                    asset_custodian: custodian,
                },
            ),
            step(bidder_a, 1, Call::Approve { spender: None, amount: 500 }),
            step(bidder_b, 1, Call::Approve { spender: None, amount: 500 }),
            step(bidder_a, 2, Call::PlaceBid { amount: 100 }),
            step(bidder_b, 3, Call::PlaceBid { amount: 150 }),
            step(owner, 100, Call::Finalize),
            step(owner, 101, Call::Withdraw),
            step(bidder_a, 101, Call::Withdraw),
            step(bidder_b, 101, Call::Withdraw),
        ],
    }
}

// ── Tests ─────────────────────────────────────────────────
