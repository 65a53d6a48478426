//! NDJSON data sink for scenario results.
//!
//! Four row kinds, each carrying a `kind` field:
//! - [`SummaryRow`]: one per run
//! - [`StepRow`]: one per executed step
//! - [`TradeRow`]: one per trade in the final table
//! - [`EventRow`]: one per published notification, in publication order

pub mod json_stream;

use crate::reporter::Report;
use crate::scenario::{ScenarioRun, StepRecord};
use nftswap_core::{TradeEvent, TradeRequest};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Serializable row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub kind: &'static str,
    pub total_steps: u32,
    pub failed_steps: u32,
    pub total_trades: u32,
    pub open: u32,
    pub accepted: u32,
    pub canceled: u32,
    pub rejected: u32,
    pub events: u32,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRow<'a> {
    pub kind: &'static str,
    #[serde(flatten)]
    pub step: &'a StepRecord,
}

/// Trade with addresses and ids pre-rendered as strings.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRow {
    pub kind: &'static str,
    pub id: u64,
    pub requester: String,
    pub counterparty: String,
    pub offered_asset: String,
    pub requested_asset: String,
    pub status: String,
}

impl From<&TradeRequest> for TradeRow {
    fn from(t: &TradeRequest) -> Self {
        TradeRow {
            kind: "trade",
            id: t.id,
            requester: t.requester.to_string(),
            counterparty: t.counterparty.to_string(),
            offered_asset: t.offered_asset.to_string(),
            requested_asset: t.requested_asset.to_string(),
            status: t.status.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRow<'a> {
    pub kind: &'static str,
    pub seq: u64,
    #[serde(flatten)]
    pub event: &'a TradeEvent,
}

// ---------------------------------------------------------------------------
// Builder: Report → Rows
// ---------------------------------------------------------------------------

impl Report {
    /// Flatten the report into sink-ready rows.
    pub fn to_rows(&self) -> (SummaryRow, Vec<TradeRow>) {
        let summary = SummaryRow {
            kind: "summary",
            total_steps: self.total_steps as u32,
            failed_steps: self.failed_steps as u32,
            total_trades: self.total_trades as u32,
            open: self.open as u32,
            accepted: self.accepted as u32,
            canceled: self.canceled as u32,
            rejected: self.rejected as u32,
            events: self.events as u32,
            elapsed_ms: self.elapsed_ms,
        };

        let trades = self.trades.iter().map(TradeRow::from).collect();

        (summary, trades)
    }
}

pub fn step_rows(run: &ScenarioRun) -> Vec<StepRow<'_>> {
    run.steps
        .iter()
        .map(|step| StepRow { kind: "step", step })
        .collect()
}

pub fn event_rows(events: &[TradeEvent]) -> Vec<EventRow<'_>> {
    events
        .iter()
        .enumerate()
        .map(|(seq, event)| EventRow {
            kind: "event",
            seq: seq as u64,
            event,
        })
        .collect()
}
