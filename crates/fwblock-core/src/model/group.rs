// ── Address books ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Address-book member type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupType {
    /// IPv4 hosts and CIDR networks.
    Ip,
    Domain,
    Port,
}

impl GroupType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::Port => "port",
        }
    }
}

/// A vendor-side address book: a named, typed, capacity-bounded set of
/// addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressGroup {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    pub members: Vec<String>,
    /// Number of policies the vendor reports as referencing this group.
    pub ref_count: u32,
}

impl AddressGroup {
    /// Free slots left under `capacity`.
    pub fn free_slots(&self, capacity: usize) -> usize {
        capacity.saturating_sub(self.members.len())
    }
}
