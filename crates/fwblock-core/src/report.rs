// ── Batch outcomes ──
//
// Per-address outcome records and the report assembled from them.

use serde::{Deserialize, Serialize};

use crate::model::AddressGroup;

/// Reference to the address book an outcome concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    pub uuid: String,
    pub name: String,
}

impl From<&AddressGroup> for GroupRef {
    fn from(group: &AddressGroup) -> Self {
        Self {
            uuid: group.uuid.clone(),
            name: group.name.clone(),
        }
    }
}

/// Why an address ended up failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// A firewall API call failed; carries the error text.
    Gateway(String),
    /// Unblock target not present in any managed group.
    NotFound,
    /// Block target left over after the engine stopped making progress.
    Stagnation,
}

/// Terminal state of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Outcome {
    Blocked {
        group: GroupRef,
        /// Member count of the group after the update.
        group_len: usize,
    },
    Unblocked {
        group: GroupRef,
        /// Remaining member count; absent when the group was deleted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_len: Option<usize>,
    },
    AlreadyPresent {
        group: GroupRef,
    },
    /// IPv6 is never sent to the firewall.
    SkippedIpv6,
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<GroupRef>,
        reason: FailureReason,
    },
}

/// Which report bucket an outcome counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Success,
    Failed,
    Existed,
}

impl Outcome {
    pub fn tally(&self) -> Tally {
        match self {
            Self::Blocked { .. } | Self::Unblocked { .. } => Tally::Success,
            Self::Failed { .. } => Tally::Failed,
            Self::AlreadyPresent { .. } | Self::SkippedIpv6 => Tally::Existed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub address: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl OutcomeRecord {
    pub fn new(address: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            address: address.into(),
            outcome,
        }
    }

    pub fn failed(
        address: impl Into<String>,
        group: Option<GroupRef>,
        reason: FailureReason,
    ) -> Self {
        Self::new(address, Outcome::Failed { group, reason })
    }
}

/// Structured result of one block/unblock batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// 200 when at least one address succeeded, else 400.
    pub status_code: u16,
    pub message: String,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub existed_count: usize,
    /// Successes, then failures, then already-satisfied addresses.
    pub results: Vec<OutcomeRecord>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Accumulates outcome records in insertion order per bucket.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    success: Vec<OutcomeRecord>,
    failed: Vec<OutcomeRecord>,
    existed: Vec<OutcomeRecord>,
}

impl ResultAggregator {
    pub fn record(&mut self, record: OutcomeRecord) {
        match record.outcome.tally() {
            Tally::Success => self.success.push(record),
            Tally::Failed => self.failed.push(record),
            Tally::Existed => self.existed.push(record),
        }
    }

    /// Build the report. `verb` is the past-tense action, e.g. `blocked`.
    pub fn into_report(self, verb: &str, total: usize) -> BatchReport {
        let success_count = self.success.len();
        let failed_count = self.failed.len();
        let existed_count = self.existed.len();

        let (status_code, message) = if success_count > 0 {
            (
                200,
                format!("{success_count} of {total} address(es) {verb}"),
            )
        } else if total == 0 {
            (400, "no addresses supplied".to_owned())
        } else {
            (400, format!("no address could be {verb}"))
        };

        let mut results = self.success;
        results.extend(self.failed);
        results.extend(self.existed);

        BatchReport {
            status_code,
            message,
            total,
            success_count,
            failed_count,
            existed_count,
            results,
        }
    }
}
