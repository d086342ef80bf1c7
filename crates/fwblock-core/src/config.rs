// ── Runtime configuration ──
//
// These types describe how the engine behaves and how to reach the
// firewall API. Core never touches disk: fwblock-config (or a test)
// builds them once and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::{Direction, GroupType};

/// Defaults applied to every control policy the engine creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDefaults {
    pub action: String,
    pub proto: String,
    /// Protocol for outbound domain policies (domain filtering is TCP only).
    pub domain_proto: String,
    pub priority: i32,
    pub dest_port: String,
    pub dest_port_type: String,
    pub enabled: bool,
    /// Wildcard network used as the non-group side of inbound policies.
    pub destination_any: String,
    /// Wildcard network used as the non-group side of outbound policies.
    pub source_any: String,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            action: "deny".into(),
            proto: "ANY".into(),
            domain_proto: "TCP".into(),
            priority: 2,
            dest_port: "ANY".into(),
            dest_port_type: "port".into(),
            enabled: true,
            destination_any: "0.0.0.0/0".into(),
            source_any: "0.0.0.0/0".into(),
        }
    }
}

impl PolicyDefaults {
    /// Protocol for a new policy guarding a group of `group_type`.
    pub fn proto_for(&self, direction: Direction, group_type: GroupType) -> &str {
        match (direction, group_type) {
            (Direction::Out, GroupType::Domain) => &self.domain_proto,
            _ => &self.proto,
        }
    }
}

/// Tuning for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Leading part of every managed group name: `{prefix}-{In|Out}-{suffix}`.
    pub group_name_prefix: String,
    /// Members a freshly created group is seeded with.
    pub placeholder_members: Vec<String>,
    pub max_addresses_per_group: usize,
    pub group_page_size: u32,
    pub policy_page_size: u32,
    /// Wait between creating a group and verifying it is visible.
    pub settle_delay: Duration,
    /// Upper bound on every gateway call.
    pub call_timeout: Duration,
    /// Consecutive no-progress rounds before remaining work is failed. The
    /// first round since the last progress whose only effect was creating a
    /// group is not counted.
    pub max_stalled_rounds: u32,
    pub policy: PolicyDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            group_name_prefix: String::new(),
            placeholder_members: vec!["1.1.1.1/32".into()],
            max_addresses_per_group: 2000,
            group_page_size: 500,
            policy_page_size: 100,
            settle_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            max_stalled_rounds: 2,
            policy: PolicyDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// Direction-scoped group-name prefix, e.g. `soar-In`.
    pub fn group_prefix(&self, direction: Direction) -> String {
        format!("{}-{}", self.group_name_prefix, direction.title())
    }

    /// Free slots in a freshly created group once the placeholder is in.
    pub fn new_group_capacity(&self) -> usize {
        self.max_addresses_per_group
            .saturating_sub(self.placeholder_members.len())
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (private endpoints with self-signed certs).
    DangerAcceptInvalid,
}

/// How to reach the firewall API.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub endpoint: Url,
    pub region: String,
    pub api_key: SecretString,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Outbound proxy URL, e.g. `http://10.0.0.8:3128`.
    pub proxy: Option<String>,
}
