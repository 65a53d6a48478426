//! Escrow state machine, settlement, notifications, report generator, and data sink.

pub mod engine;
pub mod events;
pub mod locks;
pub mod reporter;
pub mod scenario;
pub mod sink;

pub use engine::{EngineConfig, SwapEngine, DEFAULT_EVENT_CAPACITY, DEFAULT_IDENTITY};
pub use events::EventBus;
pub use locks::{AssetGuard, AssetLocks};
pub use scenario::{Scenario, ScenarioError, ScenarioRun, Step};
