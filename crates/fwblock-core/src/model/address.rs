// ── Address classification and traffic direction ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// What an address string denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressKind {
    Ipv4,
    Ipv6,
    /// IPv4 or IPv6 CIDR network.
    Network,
    Domain,
}

/// Traffic direction a control policy filters.
///
/// Determines which side of a policy references the address group:
/// the source for `in`, the destination for `out`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Parse a user-supplied direction. Only `in` and `out` are accepted.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        raw.parse().map_err(|_| {
            CoreError::validation(format!("direction must be `in` or `out`, got `{raw}`"))
        })
    }

    /// Wire value (`in` / `out`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Capitalized form used in group names (`In` / `Out`).
    pub fn title(self) -> &'static str {
        match self {
            Self::In => "In",
            Self::Out => "Out",
        }
    }
}
