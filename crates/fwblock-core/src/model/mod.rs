// ── Domain model ──
//
// Canonical types the engine reasons about. Wire types from fwblock-api
// are converted into these in `crate::convert`.

pub mod address;
pub mod group;
pub mod policy;

pub use address::{AddressKind, Direction};
pub use group::{AddressGroup, GroupType};
pub use policy::{ControlPolicy, EndpointType};
