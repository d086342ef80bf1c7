// fwblock-core: Domain model and batch block/unblock reconciliation
// between fwblock-api and its consumers (CLI, host plugins).

pub mod action;
pub mod allocator;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod model;
pub mod report;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{ActionId, dispatch};
pub use allocator::{GroupAllocator, Placement};
pub use config::{ConnectionConfig, EngineConfig, PolicyDefaults, TlsVerification};
pub use engine::{BatchMode, Engine};
pub use error::CoreError;
pub use gateway::{ApiGateway, FirewallGateway, GroupPage, NewAddressGroup, NewControlPolicy};
pub use report::{BatchReport, FailureReason, GroupRef, Outcome, OutcomeRecord, ResultAggregator};

pub use model::{AddressGroup, AddressKind, ControlPolicy, Direction, EndpointType, GroupType};
