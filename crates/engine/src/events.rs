//! Trade notifications: live broadcast plus an append-only journal.

use nftswap_core::TradeEvent;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Fan-out for [`TradeEvent`]s.
///
/// Live subscribers get events over a bounded `tokio` broadcast channel; a
/// subscriber that falls behind by more than the capacity is told how many
/// it missed and can re-read them from [`EventBus::history`].
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<TradeEvent>,
    journal: RwLock<Vec<TradeEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            journal: RwLock::new(Vec::new()),
        }
    }

    pub fn publish(&self, event: TradeEvent) {
        let (name, id) = (event.name(), event.trade_id());
        self.journal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());

        // No live subscribers is fine; the journal still has it.
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event = name, id, receivers, "event published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradeEvent> {
        self.sender.subscribe()
    }

    /// Every event published so far, in publication order.
    pub fn history(&self) -> Vec<TradeEvent> {
        self.journal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
