//! Scripted sequences of registry and engine operations.
//!
//! ```json
//! { "steps": [
//!     { "op": "mint", "to": "0x1111111111111111111111111111111111111111" },
//!     { "op": "approve_engine", "caller": "0x1111111111111111111111111111111111111111", "asset": 0 },
//!     { "op": "create", "requester": "0x11..", "counterparty": "0x22..",
//!       "offered_asset": 0, "requested_asset": 1 },
//!     { "op": "accept", "caller": "0x22..", "id": 0 },
//!     { "op": "query", "id": 0 }
//! ] }
//! ```
//!
//! A failing step is recorded and the run continues.

use crate::engine::SwapEngine;
use alloy_primitives::U256;
use nftswap_core::{AssetId, Holder, TradeId, TradeView};
use nftswap_registry::{AssetRegistry, InMemoryRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One caller/id pair of an `accept_batch` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptCall {
    pub caller: Holder,
    pub id: TradeId,
}

/// Asset ids are plain integers in scenario files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Mint {
        to: Holder,
    },
    Approve {
        caller: Holder,
        asset: u64,
        #[serde(default)]
        delegate: Option<Holder>,
    },
    /// Approve the engine's own identity.
    ApproveEngine {
        caller: Holder,
        asset: u64,
    },
    Transfer {
        caller: Holder,
        asset: u64,
        from: Holder,
        to: Holder,
    },
    Create {
        requester: Holder,
        counterparty: Holder,
        offered_asset: u64,
        requested_asset: u64,
    },
    Cancel {
        caller: Holder,
        id: TradeId,
    },
    Reject {
        caller: Holder,
        id: TradeId,
    },
    Accept {
        caller: Holder,
        id: TradeId,
    },
    AcceptBatch {
        calls: Vec<AcceptCall>,
    },
    Query {
        id: TradeId,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::Approve { .. } => "approve",
            Self::ApproveEngine { .. } => "approve_engine",
            Self::Transfer { .. } => "transfer",
            Self::Create { .. } => "create",
            Self::Cancel { .. } => "cancel",
            Self::Reject { .. } => "reject",
            Self::Accept { .. } => "accept",
            Self::AcceptBatch { .. } => "accept_batch",
            Self::Query { .. } => "query",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Result of one executed step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<TradeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<TradeView>,
    /// One entry per failed call; a batch can fail partially.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub steps: Vec<StepRecord>,
    pub elapsed: Duration,
}

impl ScenarioRun {
    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

/// Executes every step against `engine` and its in-memory registry.
pub fn run(engine: &SwapEngine<InMemoryRegistry>, scenario: &Scenario) -> ScenarioRun {
    let t0 = Instant::now();
    tracing::info!(steps = scenario.steps.len(), "running scenario");

    let steps: Vec<StepRecord> = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let mut record = execute(engine, step);
            record.index = index;
            if !record.ok {
                tracing::debug!(index, op = record.op, errors = ?record.errors, "step failed");
            }
            record
        })
        .collect();

    let run = ScenarioRun {
        steps,
        elapsed: t0.elapsed(),
    };
    tracing::info!(
        steps = run.steps.len(),
        failed = run.failed(),
        elapsed_ms = run.elapsed.as_millis(),
        "scenario done"
    );
    run
}

fn execute(engine: &SwapEngine<InMemoryRegistry>, step: &Step) -> StepRecord {
    let registry = engine.registry();
    let mut record = StepRecord {
        op: step.op(),
        ..StepRecord::default()
    };

    let outcome: Result<(), String> = match step {
        Step::Mint { to } => {
            record.asset = Some(registry.mint(*to));
            Ok(())
        }
        Step::Approve {
            caller,
            asset,
            delegate,
        } => {
            record.asset = Some(U256::from(*asset));
            registry
                .approve(*caller, U256::from(*asset), *delegate)
                .map_err(|e| e.to_string())
        }
        Step::ApproveEngine { caller, asset } => {
            record.asset = Some(U256::from(*asset));
            registry
                .approve(*caller, U256::from(*asset), Some(engine.identity()))
                .map_err(|e| e.to_string())
        }
        Step::Transfer {
            caller,
            asset,
            from,
            to,
        } => {
            record.asset = Some(U256::from(*asset));
            registry
                .transfer(*caller, U256::from(*asset), *from, *to)
                .map_err(|e| e.to_string())
        }
        Step::Create {
            requester,
            counterparty,
            offered_asset,
            requested_asset,
        } => engine
            .create_trade(
                *requester,
                *counterparty,
                U256::from(*offered_asset),
                U256::from(*requested_asset),
            )
            .map(|id| record.trade_id = Some(id))
            .map_err(|e| e.to_string()),
        Step::Cancel { caller, id } => {
            record.trade_id = Some(*id);
            engine.cancel_trade(*caller, *id).map_err(|e| e.to_string())
        }
        Step::Reject { caller, id } => {
            record.trade_id = Some(*id);
            engine.reject_trade(*caller, *id).map_err(|e| e.to_string())
        }
        Step::Accept { caller, id } => {
            record.trade_id = Some(*id);
            engine.accept_trade(*caller, *id).map_err(|e| e.to_string())
        }
        Step::AcceptBatch { calls } => {
            let pairs: Vec<(Holder, TradeId)> = calls.iter().map(|c| (c.caller, c.id)).collect();
            record.errors = engine
                .accept_batch(&pairs)
                .into_iter()
                .zip(calls)
                .filter_map(|(r, c)| r.err().map(|e| format!("trade {}: {e}", c.id)))
                .collect();
            record.ok = record.errors.is_empty();
            return record;
        }
        Step::Query { id } => {
            record.trade_id = Some(*id);
            record.view = Some(engine.query_trade(*id));
            Ok(())
        }
    };

    match outcome {
        Ok(()) => record.ok = true,
        Err(e) => record.errors.push(e),
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use std::sync::Arc;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    fn engine() -> SwapEngine<InMemoryRegistry> {
        SwapEngine::new(EngineConfig::default(), Arc::new(InMemoryRegistry::new()))
    }

    fn happy_path() -> String {
        format!(
            r#"{{ "steps": [
                {{ "op": "mint", "to": "{ALICE}" }},
                {{ "op": "mint", "to": "{BOB}" }},
                {{ "op": "approve_engine", "caller": "{ALICE}", "asset": 0 }},
                {{ "op": "approve_engine", "caller": "{BOB}", "asset": 1 }},
                {{ "op": "create", "requester": "{ALICE}", "counterparty": "{BOB}",
                   "offered_asset": 0, "requested_asset": 1 }},
                {{ "op": "accept", "caller": "{BOB}", "id": 0 }},
                {{ "op": "query", "id": 0 }},
                {{ "op": "query", "id": 5 }}
            ] }}"#
        )
    }

    #[test]
    fn parses_and_runs_happy_path() {
        let scenario = Scenario::from_json(&happy_path()).unwrap();
        assert_eq!(scenario.steps.len(), 8);
        assert_eq!(scenario.steps[2].op(), "approve_engine");

        let engine = engine();
        let run = run(&engine, &scenario);
        assert_eq!(run.failed(), 0);
        assert_eq!(run.steps[1].asset, Some(U256::from(1)));
        assert_eq!(run.steps[4].trade_id, Some(0));

        let view = run.steps[6].view.clone().unwrap();
        assert!(!view.is_open);
        assert_eq!(view.offered_asset, U256::from(0));
        assert!(run.steps[7].view.as_ref().unwrap().is_zeroed());

        let bob: Holder = BOB.parse().unwrap();
        assert_eq!(engine.registry().owner_of(U256::from(0)).unwrap(), bob);
    }

    #[test]
    fn failures_are_recorded_and_run_continues() {
        let json = format!(
            r#"{{ "steps": [
                {{ "op": "cancel", "caller": "{ALICE}", "id": 0 }},
                {{ "op": "mint", "to": "{ALICE}" }}
            ] }}"#
        );
        let run = run(&engine(), &Scenario::from_json(&json).unwrap());
        assert!(!run.steps[0].ok);
        assert_eq!(run.steps[0].errors, vec!["trade 0 is not open".to_string()]);
        assert!(run.steps[1].ok);
        assert_eq!(run.steps[1].index, 1);
    }

    #[test]
    fn approve_without_delegate_clears() {
        let json = format!(
            r#"{{ "steps": [
                {{ "op": "mint", "to": "{ALICE}" }},
                {{ "op": "approve_engine", "caller": "{ALICE}", "asset": 0 }},
                {{ "op": "approve", "caller": "{ALICE}", "asset": 0 }}
            ] }}"#
        );
        let engine = engine();
        let run = run(&engine, &Scenario::from_json(&json).unwrap());
        assert_eq!(run.failed(), 0);
        assert_eq!(
            engine
                .registry()
                .approved_delegate_of(U256::from(0))
                .unwrap(),
            None
        );
    }

    #[test]
    fn unknown_op_is_a_parse_error() {
        let err = Scenario::from_json(r#"{ "steps": [ { "op": "burn" } ] }"#).unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }
}
