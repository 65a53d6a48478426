//! The escrow state machine.
//!
//! Trades live in an append-only arena indexed by id. Every operation on a
//! trade first claims that trade's two assets in the [`AssetLocks`] table,
//! so transitions of one trade are mutually exclusive and trades that share
//! an asset run one at a time, while unrelated trades settle in parallel.
//!
//! Settlement validates custody and approval on both sides, then hands both
//! transfers to the registry as one all-or-nothing batch and writes the
//! status while holding the trade table's write lock. Notifications go out
//! after that lock is released, still under the asset claim, which keeps
//! per-trade event order intact.

use crate::events::EventBus;
use crate::locks::AssetLocks;
use alloy_primitives::Address;
use nftswap_core::{
    AssetId, Holder, SwapError, SwapResult, TradeEvent, TradeId, TradeOutcome, TradeRequest,
    TradeView, Transfer,
};
use nftswap_registry::AssetRegistry;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Escrow identity used when none is configured.
pub const DEFAULT_IDENTITY: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xe5, 0xc0,
]);

/// Default broadcast buffer for live subscribers.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address the engine acts as in the registry. Holders approve this
    /// address as the delegate of the asset they put up.
    pub identity: Holder,
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

pub struct SwapEngine<R: ?Sized> {
    identity: Holder,
    trades: RwLock<Vec<TradeRequest>>,
    locks: AssetLocks,
    events: EventBus,
    registry: Arc<R>,
}

impl<R: AssetRegistry + ?Sized> SwapEngine<R> {
    pub fn new(config: EngineConfig, registry: Arc<R>) -> Self {
        tracing::info!(identity = %config.identity, "escrow engine ready");
        Self {
            identity: config.identity,
            trades: RwLock::new(Vec::new()),
            locks: AssetLocks::new(),
            events: EventBus::new(config.event_capacity),
            registry,
        }
    }

    pub fn identity(&self) -> Holder {
        self.identity
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Opens a trade of `offered_asset` for `requested_asset`.
    ///
    /// Checks, in order: requester owns the offered asset, counterparty owns
    /// the requested asset, the engine is the offered asset's delegate. The
    /// counterparty's approval is not needed until acceptance.
    pub fn create_trade(
        &self,
        requester: Holder,
        counterparty: Holder,
        offered_asset: AssetId,
        requested_asset: AssetId,
    ) -> SwapResult<TradeId> {
        let _claim = self.locks.acquire(&[offered_asset, requested_asset]);

        let checked = self
            .ensure_owner(offered_asset, requester)
            .and_then(|_| self.ensure_owner(requested_asset, counterparty))
            .and_then(|_| self.ensure_approved(offered_asset));
        if let Err(e) = checked {
            tracing::warn!(%requester, %counterparty, %offered_asset, %requested_asset, error = %e, "create rejected");
            return Err(e);
        }

        let trade = {
            let mut trades = self.write();
            let trade = TradeRequest::open(
                trades.len() as TradeId,
                requester,
                counterparty,
                offered_asset,
                requested_asset,
            );
            trades.push(trade.clone());
            trade
        };

        tracing::info!(
            id = trade.id,
            %requester,
            %counterparty,
            %offered_asset,
            %requested_asset,
            "trade created"
        );
        self.events.publish(TradeEvent::created(&trade));
        Ok(trade.id)
    }

    /// Withdraws an open trade. Only the requester may cancel.
    pub fn cancel_trade(&self, caller: Holder, id: TradeId) -> SwapResult<()> {
        self.close_trade(caller, id, TradeOutcome::Canceled)
    }

    /// Declines an open trade. Only the counterparty may reject.
    pub fn reject_trade(&self, caller: Holder, id: TradeId) -> SwapResult<()> {
        self.close_trade(caller, id, TradeOutcome::Rejected)
    }

    /// Accepts an open trade and swaps the two assets. Only the counterparty
    /// may accept.
    pub fn accept_trade(&self, caller: Holder, id: TradeId) -> SwapResult<()> {
        self.close_trade(caller, id, TradeOutcome::Accepted)
    }

    /// Runs several acceptances on the rayon pool.
    ///
    /// Results are in input order. Acceptances over disjoint assets settle in
    /// parallel; ones sharing an asset wait on each other.
    pub fn accept_batch(&self, calls: &[(Holder, TradeId)]) -> Vec<SwapResult<()>> {
        use rayon::prelude::*;

        tracing::info!(calls = calls.len(), "parallel acceptance");
        calls
            .par_iter()
            .map(|(caller, id)| self.accept_trade(*caller, *id))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Projection of trade `id`. Unknown ids yield the zero-valued view.
    pub fn query_trade(&self, id: TradeId) -> TradeView {
        self.read()
            .get(index(id))
            .map(TradeRequest::view)
            .unwrap_or_else(TradeView::zeroed)
    }

    /// Full record, status included. `None` means the id was never created.
    pub fn trade(&self, id: TradeId) -> Option<TradeRequest> {
        self.read().get(index(id)).cloned()
    }

    /// Number of trades ever created, which is also the next id.
    pub fn trade_count(&self) -> u64 {
        self.read().len() as u64
    }

    /// Snapshot of every trade in id order.
    pub fn trades(&self) -> Vec<TradeRequest> {
        self.read().clone()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TradeEvent> {
        self.events.subscribe()
    }

    pub fn history(&self) -> Vec<TradeEvent> {
        self.events.history()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn close_trade(&self, caller: Holder, id: TradeId, outcome: TradeOutcome) -> SwapResult<()> {
        let result = self.try_close(caller, id, outcome);
        if let Err(e) = &result {
            tracing::warn!(id, %caller, outcome = %outcome, error = %e, "transition rejected");
        }
        result
    }

    fn try_close(&self, caller: Holder, id: TradeId, outcome: TradeOutcome) -> SwapResult<()> {
        // The asset pair of a trade never changes, so an unlocked read is
        // enough to learn what to claim.
        let assets = self.open_trade(id)?.assets();
        let _claim = self.locks.acquire(&assets);

        // Something else may have closed it while we waited.
        let trade = self.open_trade(id)?;

        let authorized = match outcome {
            TradeOutcome::Canceled => trade.requester,
            TradeOutcome::Rejected | TradeOutcome::Accepted => trade.counterparty,
        };
        if caller != authorized {
            return Err(SwapError::Unauthorized { id, caller });
        }

        if outcome == TradeOutcome::Accepted {
            self.check_settlement(&trade)?;
        }

        {
            // Swap and status commit under one write guard, so no reader of
            // the trade table sees moved assets on an open trade.
            let mut trades = self.write();
            if outcome == TradeOutcome::Accepted {
                self.settle(&trade)?;
            }
            if let Some(stored) = trades.get_mut(index(id)) {
                // Cannot fail: we hold the claim and saw it open.
                let closed = stored.close(outcome);
                debug_assert!(closed, "trade {id} closed under our claim");
            }
        }

        tracing::info!(id, %caller, outcome = %outcome, "trade closed");
        self.events.publish(TradeEvent::updated(id, outcome));
        Ok(())
    }

    /// Custody and approval on both sides, in the order failures are reported.
    fn check_settlement(&self, trade: &TradeRequest) -> SwapResult<()> {
        self.ensure_owner(trade.offered_asset, trade.requester)?;
        self.ensure_owner(trade.requested_asset, trade.counterparty)?;
        self.ensure_approved(trade.offered_asset)?;
        self.ensure_approved(trade.requested_asset)
    }

    /// Moves both assets in one all-or-nothing batch.
    fn settle(&self, trade: &TradeRequest) -> SwapResult<()> {
        let legs = [
            Transfer {
                asset: trade.offered_asset,
                from: trade.requester,
                to: trade.counterparty,
            },
            Transfer {
                asset: trade.requested_asset,
                from: trade.counterparty,
                to: trade.requester,
            },
        ];
        self.registry
            .transfer_all(self.identity, &legs)
            .inspect_err(|e| {
                tracing::warn!(id = trade.id, asset = %e.asset(), error = %e, "settlement refused")
            })?;

        tracing::debug!(id = trade.id, "assets swapped");
        Ok(())
    }

    fn ensure_owner(&self, asset: AssetId, holder: Holder) -> SwapResult<()> {
        match self.registry.owner_of(asset) {
            Ok(owner) if owner == holder => Ok(()),
            Ok(owner) => {
                tracing::debug!(%asset, %owner, expected = %holder, "owner mismatch");
                Err(SwapError::NotOwner(asset))
            }
            Err(e) => {
                tracing::debug!(%asset, error = %e, "owner lookup failed");
                Err(SwapError::NotOwner(asset))
            }
        }
    }

    fn ensure_approved(&self, asset: AssetId) -> SwapResult<()> {
        match self.registry.approved_delegate_of(asset) {
            Ok(Some(delegate)) if delegate == self.identity => Ok(()),
            Ok(_) => Err(SwapError::NotApproved(asset)),
            Err(e) => {
                tracing::debug!(%asset, error = %e, "approval lookup failed");
                Err(SwapError::NotOwner(asset))
            }
        }
    }

    /// Open trade `id`, or `NotFound` for unknown and closed ids alike.
    fn open_trade(&self, id: TradeId) -> SwapResult<TradeRequest> {
        self.read()
            .get(index(id))
            .filter(|t| t.is_open())
            .cloned()
            .ok_or(SwapError::NotFound(id))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TradeRequest>> {
        self.trades.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TradeRequest>> {
        self.trades.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Arena slot for `id`; ids too large for the platform map past the end.
#[inline]
fn index(id: TradeId) -> usize {
    usize::try_from(id).unwrap_or(usize::MAX)
}
