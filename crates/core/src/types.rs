//! Domain types for the nftswap escrow engine.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity that owns assets and calls engine operations.
pub type Holder = Address;

/// Non-fungible token id. 256 bits wide, like the registries it mirrors.
pub type AssetId = U256;

/// Sequential trade id, allocated from 0.
pub type TradeId = u64;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of a trade request. Only `Open` is non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Accepted,
    Canceled,
    Rejected,
}

impl TradeStatus {
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an open trade was closed.
///
/// Serialized in lowercase (`"accepted"`, `"canceled"`, `"rejected"`), which
/// is also the wire form of `TradeUpdated.outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Accepted,
    Canceled,
    Rejected,
}

impl TradeOutcome {
    pub fn status(&self) -> TradeStatus {
        match self {
            Self::Accepted => TradeStatus::Accepted,
            Self::Canceled => TradeStatus::Canceled,
            Self::Rejected => TradeStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trade request
// ---------------------------------------------------------------------------

/// A proposed exchange of `offered_asset` (held by `requester`) for
/// `requested_asset` (held by `counterparty`).
///
/// Everything except `status` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub id: TradeId,
    pub requester: Holder,
    pub counterparty: Holder,
    pub offered_asset: AssetId,
    pub requested_asset: AssetId,
    pub status: TradeStatus,
}

impl TradeRequest {
    pub fn open(
        id: TradeId,
        requester: Holder,
        counterparty: Holder,
        offered_asset: AssetId,
        requested_asset: AssetId,
    ) -> Self {
        Self {
            id,
            requester,
            counterparty,
            offered_asset,
            requested_asset,
            status: TradeStatus::Open,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Both assets named by the trade, offered first.
    #[inline]
    pub fn assets(&self) -> [AssetId; 2] {
        [self.offered_asset, self.requested_asset]
    }

    /// Moves an open trade to the terminal status for `outcome`.
    ///
    /// Returns `false` and leaves the trade untouched if it is already closed.
    pub fn close(&mut self, outcome: TradeOutcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.status();
        true
    }

    pub fn view(&self) -> TradeView {
        TradeView {
            requester: self.requester,
            counterparty: self.counterparty,
            offered_asset: self.offered_asset,
            requested_asset: self.requested_asset,
            is_open: self.is_open(),
        }
    }
}

/// Read-only projection returned by `query_trade`.
///
/// `Default` is the zero-valued view reported for ids that were never
/// created: zero addresses, zero asset ids, `is_open = false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeView {
    pub requester: Holder,
    pub counterparty: Holder,
    pub offered_asset: AssetId,
    pub requested_asset: AssetId,
    pub is_open: bool,
}

impl TradeView {
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// True for the view of an id that was never created.
    ///
    /// A real trade between two zero addresses over asset 0 looks the same;
    /// use the engine's full record lookup when that matters.
    pub fn is_zeroed(&self) -> bool {
        self.requester == Address::ZERO
            && self.counterparty == Address::ZERO
            && self.offered_asset == U256::ZERO
            && self.requested_asset == U256::ZERO
            && !self.is_open
    }
}

// ---------------------------------------------------------------------------
// Registry transfer leg
// ---------------------------------------------------------------------------

/// One ownership move, `from` -> `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: AssetId,
    pub from: Holder,
    pub to: Holder,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Append-only notification published after a state change commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TradeEvent {
    TradeCreated {
        id: TradeId,
        requester: Holder,
        counterparty: Holder,
        offered_asset: AssetId,
        requested_asset: AssetId,
    },
    TradeUpdated {
        id: TradeId,
        outcome: TradeOutcome,
    },
}

impl TradeEvent {
    pub fn created(trade: &TradeRequest) -> Self {
        Self::TradeCreated {
            id: trade.id,
            requester: trade.requester,
            counterparty: trade.counterparty,
            offered_asset: trade.offered_asset,
            requested_asset: trade.requested_asset,
        }
    }

    pub fn updated(id: TradeId, outcome: TradeOutcome) -> Self {
        Self::TradeUpdated { id, outcome }
    }

    pub fn trade_id(&self) -> TradeId {
        match self {
            Self::TradeCreated { id, .. } | Self::TradeUpdated { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TradeCreated { .. } => "TradeCreated",
            Self::TradeUpdated { .. } => "TradeUpdated",
        }
    }
}

// Compile-time layout assertions.
const _: () = assert!(std::mem::size_of::<Holder>() == 20);
const _: () = assert!(std::mem::size_of::<AssetId>() == 32);
