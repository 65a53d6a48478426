//! Scenario report generator.
//!
//! Summarizes a [`ScenarioRun`] together with the engine's final trade table
//! and notification count, and renders it for humans.

use crate::scenario::ScenarioRun;
use nftswap_core::{TradeRequest, TradeStatus};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total_steps: usize,
    pub failed_steps: usize,
    pub total_trades: usize,
    pub open: usize,
    pub accepted: usize,
    pub canceled: usize,
    pub rejected: usize,
    pub events: usize,
    pub elapsed_ms: u64,
    pub trades: Vec<TradeRequest>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Report {
    /// Build a report from a finished run plus the engine's state after it.
    pub fn build(run: &ScenarioRun, trades: Vec<TradeRequest>, events: usize) -> Self {
        let count = |status: TradeStatus| trades.iter().filter(|t| t.status == status).count();

        Report {
            total_steps: run.steps.len(),
            failed_steps: run.failed(),
            total_trades: trades.len(),
            open: count(TradeStatus::Open),
            accepted: count(TradeStatus::Accepted),
            canceled: count(TradeStatus::Canceled),
            rejected: count(TradeStatus::Rejected),
            events,
            elapsed_ms: run.elapsed.as_millis() as u64,
            trades,
            elapsed: run.elapsed,
        }
    }

    /// Render the report, listing every step and every trade.
    pub fn render(&self, run: &ScenarioRun) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                    NFTSWAP SCENARIO REPORT                   ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!("║  Steps:              {:>39} ║\n", self.total_steps));
        out.push_str(&format!("║  Failed steps:       {:>39} ║\n", self.failed_steps));
        out.push_str(&format!("║  Trades:             {:>39} ║\n", self.total_trades));
        out.push_str(&format!(
            "║  Open / accepted:    {:>39} ║\n",
            format!("{} / {}", self.open, self.accepted)
        ));
        out.push_str(&format!(
            "║  Canceled / rejected:{:>39} ║\n",
            format!("{} / {}", self.canceled, self.rejected)
        ));
        out.push_str(&format!("║  Notifications:      {:>39} ║\n", self.events));
        out.push_str(&format!("║  Elapsed:            {:>39?} ║\n", self.elapsed));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str("║  STEPS                                                       ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for step in &run.steps {
            let mark = if step.ok { "ok " } else { "ERR" };
            let mut line = format!("║  {:>3}. [{}] {}", step.index, mark, step.op);
            if let Some(id) = step.trade_id {
                line.push_str(&format!(" trade={id}"));
            }
            if let Some(asset) = step.asset {
                line.push_str(&format!(" asset={asset}"));
            }
            if let Some(view) = &step.view {
                line.push_str(&format!(" open={}", view.is_open));
            }
            out.push_str(&line);
            out.push('\n');
            for err in &step.errors {
                out.push_str(&format!("║        {err}\n"));
            }
        }

        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        if self.trades.is_empty() {
            out.push_str("║  No trades created.                                          ║\n");
        } else {
            out.push_str("║  TRADES                                                      ║\n");
            out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
            for t in &self.trades {
                out.push_str(&format!(
                    "║  #{} [{}] asset {} for asset {}\n",
                    t.id, t.status, t.offered_asset, t.requested_asset
                ));
                out.push_str(&format!(
                    "║     {} -> {}\n",
                    t.requester, t.counterparty
                ));
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}
