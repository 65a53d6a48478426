//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod types;

pub use error::{RegistryError, RegistryResult, SwapError, SwapResult};
pub use types::{
    AssetId, Holder, TradeEvent, TradeId, TradeOutcome, TradeRequest, TradeStatus, TradeView,
    Transfer,
};
