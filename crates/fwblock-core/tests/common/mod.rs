// In-memory `FirewallGateway` with a call log and failure injection.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use fwblock_core::{
    AddressGroup, ControlPolicy, CoreError, Direction, EngineConfig, FirewallGateway, GroupPage,
    GroupType, NewAddressGroup, NewControlPolicy,
};

/// Gateway operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListGroups,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    ListPolicies,
    CreatePolicy,
    DeletePolicy,
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListGroups { query: String },
    CreateGroup { name: String, members: Vec<String> },
    UpdateGroup { uuid: String, members: Vec<String> },
    DeleteGroup { uuid: String },
    ListPolicies { description: Option<String> },
    CreatePolicy(NewControlPolicy),
    DeletePolicy { rule_id: String },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Self::ListGroups { .. } => Op::ListGroups,
            Self::CreateGroup { .. } => Op::CreateGroup,
            Self::UpdateGroup { .. } => Op::UpdateGroup,
            Self::DeleteGroup { .. } => Op::DeleteGroup,
            Self::ListPolicies { .. } => Op::ListPolicies,
            Self::CreatePolicy(_) => Op::CreatePolicy,
            Self::DeletePolicy { .. } => Op::DeletePolicy,
        }
    }
}

#[derive(Default)]
struct State {
    groups: Vec<AddressGroup>,
    policies: Vec<ControlPolicy>,
    calls: Vec<Call>,
    failing: HashSet<Op>,
    /// Created groups stay invisible to listings.
    hide_created: bool,
    /// Delay before every listing answers.
    list_delay: Option<Duration>,
    /// Listings report a total count of zero.
    omit_total_count: bool,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<State>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    // ── Seeding ──────────────────────────────────────────────────────

    /// Seed a group and return its UUID.
    pub fn with_group(&self, name: &str, group_type: GroupType, members: &[&str]) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        let uuid = format!("seed-{}", state.next_id);
        state.groups.push(AddressGroup {
            uuid: uuid.clone(),
            name: name.to_owned(),
            description: name.to_owned(),
            group_type,
            members: members.iter().map(|m| (*m).to_owned()).collect(),
            ref_count: 0,
        });
        uuid
    }

    /// Seed the enforcing policy for a seeded group.
    pub fn with_paired_policy(&self, direction: Direction, group_uuid: &str) -> String {
        let mut state = self.lock();
        let name = state
            .groups
            .iter()
            .find(|g| g.uuid == group_uuid)
            .map(|g| g.name.clone())
            .unwrap();
        state.next_id += 1;
        let rule_id = format!("seed-rule-{}", state.next_id);
        let (source, source_type, destination, destination_type) = match direction {
            Direction::In => (group_uuid.to_owned(), "group", "0.0.0.0/0".to_owned(), "net"),
            Direction::Out => ("0.0.0.0/0".to_owned(), "net", group_uuid.to_owned(), "group"),
        };
        state.policies.push(ControlPolicy {
            rule_id: rule_id.clone(),
            direction,
            action: "deny".into(),
            description: name,
            source,
            source_type: source_type.into(),
            destination,
            destination_type: destination_type.into(),
            proto: "ANY".into(),
            priority: 2,
            enabled: true,
        });
        rule_id
    }

    // ── Behaviour knobs ──────────────────────────────────────────────

    pub fn fail(&self, op: Op) {
        self.lock().failing.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.lock().failing.remove(&op);
    }

    pub fn fail_everything(&self) {
        let mut state = self.lock();
        for op in [
            Op::ListGroups,
            Op::CreateGroup,
            Op::UpdateGroup,
            Op::DeleteGroup,
            Op::ListPolicies,
            Op::CreatePolicy,
            Op::DeletePolicy,
        ] {
            state.failing.insert(op);
        }
    }

    pub fn hide_created_groups(&self) {
        self.lock().hide_created = true;
    }

    pub fn delay_listings(&self, delay: Duration) {
        self.lock().list_delay = Some(delay);
    }

    pub fn omit_total_count(&self) {
        self.lock().omit_total_count = true;
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Calls that mutate firewall state, in order.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c.op(), Op::ListGroups | Op::ListPolicies))
            .collect()
    }

    pub fn groups(&self) -> Vec<AddressGroup> {
        self.lock().groups.clone()
    }

    pub fn group(&self, uuid: &str) -> Option<AddressGroup> {
        self.lock().groups.iter().find(|g| g.uuid == uuid).cloned()
    }

    pub fn policies(&self) -> Vec<ControlPolicy> {
        self.lock().policies.clone()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn record(&self, call: Call) -> Result<(), CoreError> {
        let mut state = self.lock();
        let op = call.op();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(CoreError::Api {
                message: format!("injected {op:?} failure"),
                code: Some("InternalError".into()),
                status: Some(500),
            });
        }
        Ok(())
    }
}

impl FirewallGateway for FakeGateway {
    async fn list_address_groups(
        &self,
        query: &str,
        group_type: Option<GroupType>,
        page_number: u32,
        page_size: u32,
    ) -> Result<GroupPage, CoreError> {
        let delay = self.lock().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(Call::ListGroups {
            query: query.to_owned(),
        })?;

        let state = self.lock();
        let matching: Vec<AddressGroup> = state
            .groups
            .iter()
            .filter(|g| g.name.contains(query))
            .filter(|g| group_type.is_none_or(|t| g.group_type == t))
            .cloned()
            .collect();
        let total_count = if state.omit_total_count {
            0
        } else {
            matching.len() as u64
        };
        let size = page_size as usize;
        let skip = (page_number.saturating_sub(1) as usize) * size;
        Ok(GroupPage {
            groups: matching.into_iter().skip(skip).take(size).collect(),
            total_count,
        })
    }

    async fn create_address_group(&self, group: &NewAddressGroup) -> Result<String, CoreError> {
        self.record(Call::CreateGroup {
            name: group.name.clone(),
            members: group.members.clone(),
        })?;
        let mut state = self.lock();
        state.next_id += 1;
        let uuid = format!("u-{}", state.next_id);
        if !state.hide_created {
            state.groups.push(AddressGroup {
                uuid: uuid.clone(),
                name: group.name.clone(),
                description: group.description.clone(),
                group_type: group.group_type,
                members: group.members.clone(),
                ref_count: 0,
            });
        }
        Ok(uuid)
    }

    async fn update_address_group(
        &self,
        uuid: &str,
        _name: &str,
        _description: &str,
        members: &[String],
    ) -> Result<(), CoreError> {
        self.record(Call::UpdateGroup {
            uuid: uuid.to_owned(),
            members: members.to_vec(),
        })?;
        let mut state = self.lock();
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.uuid == uuid)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "address group".into(),
                identifier: uuid.to_owned(),
            })?;
        group.members = members.to_vec();
        Ok(())
    }

    async fn delete_address_group(&self, uuid: &str) -> Result<(), CoreError> {
        self.record(Call::DeleteGroup {
            uuid: uuid.to_owned(),
        })?;
        self.lock().groups.retain(|g| g.uuid != uuid);
        Ok(())
    }

    async fn list_control_policies(
        &self,
        direction: Direction,
        description: Option<&str>,
    ) -> Result<Vec<ControlPolicy>, CoreError> {
        self.record(Call::ListPolicies {
            description: description.map(str::to_owned),
        })?;
        Ok(self
            .lock()
            .policies
            .iter()
            .filter(|p| p.direction == direction)
            .filter(|p| description.is_none_or(|d| p.description.contains(d)))
            .cloned()
            .collect())
    }

    async fn create_control_policy(&self, policy: &NewControlPolicy) -> Result<String, CoreError> {
        self.record(Call::CreatePolicy(policy.clone()))?;
        let mut state = self.lock();
        state.next_id += 1;
        let rule_id = format!("r-{}", state.next_id);
        state.policies.push(ControlPolicy {
            rule_id: rule_id.clone(),
            direction: policy.direction,
            action: policy.action.clone(),
            description: policy.description.clone(),
            source: policy.source.clone(),
            source_type: policy.source_type.to_string(),
            destination: policy.destination.clone(),
            destination_type: policy.destination_type.to_string(),
            proto: policy.proto.clone(),
            priority: policy.priority,
            enabled: policy.enabled,
        });
        Ok(rule_id)
    }

    async fn delete_control_policy(&self, rule_id: &str, _direction: Direction) -> Result<(), CoreError> {
        self.record(Call::DeletePolicy {
            rule_id: rule_id.to_owned(),
        })?;
        self.lock().policies.retain(|p| p.rule_id != rule_id);
        Ok(())
    }
}

/// Engine config for tests: `soar` prefix, no placeholder, no settle wait.
pub fn test_config(capacity: usize) -> EngineConfig {
    EngineConfig {
        group_name_prefix: "soar".into(),
        placeholder_members: Vec::new(),
        max_addresses_per_group: capacity,
        settle_delay: Duration::ZERO,
        ..EngineConfig::default()
    }
}
