// fwblock-api: Async Rust client for the cloud firewall OpenAPI
// (address books and access-control policies).

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::FirewallClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
