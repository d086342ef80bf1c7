// ── Control policies ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{AddressGroup, Direction};

/// What a policy endpoint (`source` / `destination`) holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EndpointType {
    /// A CIDR network such as the `0.0.0.0/0` wildcard.
    Net,
    /// An address book, referenced by UUID.
    Group,
    Domain,
    Location,
}

impl EndpointType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Net => "net",
            Self::Group => "group",
            Self::Domain => "domain",
            Self::Location => "location",
        }
    }
}

/// A firewall access-control rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPolicy {
    pub rule_id: String,
    pub direction: Direction,
    pub action: String,
    pub description: String,
    pub source: String,
    pub source_type: String,
    pub destination: String,
    pub destination_type: String,
    pub proto: String,
    pub priority: i32,
    pub enabled: bool,
}

impl ControlPolicy {
    /// The `(type, value)` of the endpoint that carries the address group
    /// for this policy's direction.
    pub fn group_side(&self) -> (&str, &str) {
        match self.direction {
            Direction::In => (&self.source_type, &self.source),
            Direction::Out => (&self.destination_type, &self.destination),
        }
    }

    /// Whether this policy is the enforcing rule paired with `group`:
    /// same description, and the group-side endpoint names the group by
    /// UUID or by name.
    pub fn is_paired_with(&self, group: &AddressGroup) -> bool {
        let (_, value) = self.group_side();
        self.description == group.name && (value == group.uuid || value == group.name)
    }
}
