// ── Group allocation ──
//
// Places addresses into direction-scoped address books under a capacity
// limit, creates a new group + paired policy when nothing has room, and
// removes addresses from groups (retiring a group and its policy once it
// empties). Every gateway call is sequential and bounded by
// `EngineConfig::call_timeout`.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::gateway::{
    FirewallGateway, NewAddressGroup, NewControlPolicy, collect_groups, with_timeout,
};
use crate::matcher::equivalent;
use crate::model::{AddressGroup, Direction, EndpointType, GroupType};
use crate::report::{FailureReason, GroupRef, Outcome, OutcomeRecord};

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// A group + policy pair created during a placement pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedGroup {
    pub uuid: String,
    pub name: String,
    pub rule_id: String,
}

/// Result of one placement pass.
#[derive(Debug, Default)]
pub struct Placement {
    /// One record per address consumed by this pass.
    pub records: Vec<OutcomeRecord>,
    /// Set when the pass had leftovers and created a new group for them.
    pub created: Option<CreatedGroup>,
}

/// Capacity-aware placement and removal over a [`FirewallGateway`].
pub struct GroupAllocator<'a, G> {
    gateway: &'a G,
    config: &'a EngineConfig,
}

impl<'a, G: FirewallGateway> GroupAllocator<'a, G> {
    pub fn new(gateway: &'a G, config: &'a EngineConfig) -> Self {
        Self { gateway, config }
    }

    // ── Listing ──────────────────────────────────────────────────────

    /// Every `group_type` address book whose name starts with the
    /// direction-scoped prefix, across all pages.
    pub async fn list_groups(
        &self,
        direction: Direction,
        group_type: GroupType,
    ) -> Result<Vec<AddressGroup>, CoreError> {
        let prefix = self.config.group_prefix(direction);
        let mut groups = collect_groups(
            self.gateway,
            &prefix,
            Some(group_type),
            self.config.group_page_size,
            self.config.call_timeout,
        )
        .await?;

        groups.retain(|g| g.name.starts_with(&prefix));
        debug!(%prefix, %group_type, count = groups.len(), "listed managed groups");
        Ok(groups)
    }

    // ── Block path ───────────────────────────────────────────────────

    /// Top up groups that have spare capacity and an enforcing policy with
    /// `pending` (taken in input order), then create one new group if
    /// anything is left. The new group is not filled in this pass.
    pub async fn place(
        &self,
        direction: Direction,
        group_type: GroupType,
        groups: &[AddressGroup],
        pending: &[String],
    ) -> Placement {
        let capacity = self.config.max_addresses_per_group;
        let mut placement = Placement::default();
        let mut next = 0;

        for group in groups {
            if next >= pending.len() {
                break;
            }
            let free = group.free_slots(capacity);
            if free == 0 {
                continue;
            }

            match self.has_paired_policy(direction, group).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(group = %group.name, "no paired policy, skipping group");
                    continue;
                }
                Err(e) => {
                    warn!(group = %group.name, error = %e, "policy lookup failed, skipping group");
                    continue;
                }
            }

            let take = free.min(pending.len() - next);
            let batch = &pending[next..next + take];
            next += take;

            let mut members = group.members.clone();
            members.extend_from_slice(batch);

            let result = with_timeout(
                self.config.call_timeout,
                self.gateway.update_address_group(
                    &group.uuid,
                    &group.name,
                    &group.description,
                    &members,
                ),
            )
            .await;

            let group_ref = GroupRef::from(group);
            match result {
                Ok(()) => {
                    info!(group = %group.name, added = take, size = members.len(), "addresses placed");
                    placement.records.extend(batch.iter().map(|addr| {
                        OutcomeRecord::new(
                            addr.as_str(),
                            Outcome::Blocked {
                                group: group_ref.clone(),
                                group_len: members.len(),
                            },
                        )
                    }));
                }
                Err(e) => {
                    error!(group = %group.name, error = %e, "group update failed");
                    let reason = FailureReason::Gateway(e.to_string());
                    placement.records.extend(batch.iter().map(|addr| {
                        OutcomeRecord::failed(addr.as_str(), Some(group_ref.clone()), reason.clone())
                    }));
                }
            }
        }

        if next < pending.len() {
            if self.config.new_group_capacity() == 0 {
                warn!(
                    capacity,
                    placeholders = self.config.placeholder_members.len(),
                    "a new group would start full, not creating one"
                );
                return placement;
            }
            match self.create_group(direction, group_type).await {
                Ok(created) => placement.created = Some(created),
                Err(e) => warn!(%direction, %group_type, error = %e, "could not allocate new group"),
            }
        }

        placement
    }

    async fn has_paired_policy(
        &self,
        direction: Direction,
        group: &AddressGroup,
    ) -> Result<bool, CoreError> {
        let policies = with_timeout(
            self.config.call_timeout,
            self.gateway
                .list_control_policies(direction, Some(&group.name)),
        )
        .await?;
        Ok(policies.iter().any(|p| p.description == group.name))
    }

    /// Create a seeded group, wait for it to settle, verify it is visible,
    /// then create its paired policy. Any failure after the group exists
    /// deletes the group again.
    pub async fn create_group(
        &self,
        direction: Direction,
        group_type: GroupType,
    ) -> Result<CreatedGroup, CoreError> {
        let name = format!("{}-{}", self.config.group_prefix(direction), random_suffix());
        let new_group = NewAddressGroup {
            name: name.clone(),
            description: name.clone(),
            group_type,
            members: self.config.placeholder_members.clone(),
        };

        let uuid = with_timeout(
            self.config.call_timeout,
            self.gateway.create_address_group(&new_group),
        )
        .await?;
        info!(group = %name, %uuid, "address group created");

        tokio::time::sleep(self.config.settle_delay).await;

        let verified = match self.is_visible(&uuid, &name, group_type).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CoreError::NotFound {
                entity_type: "address group".into(),
                identifier: name.clone(),
            }),
            Err(e) => Err(e),
        };
        if let Err(e) = verified {
            self.compensate(&uuid, &name).await;
            return Err(e);
        }

        let policy = self.paired_policy(direction, group_type, &uuid, &name);
        match with_timeout(
            self.config.call_timeout,
            self.gateway.create_control_policy(&policy),
        )
        .await
        {
            Ok(rule_id) => {
                info!(group = %name, %rule_id, "paired policy created");
                Ok(CreatedGroup {
                    uuid,
                    name,
                    rule_id,
                })
            }
            Err(e) => {
                error!(group = %name, error = %e, "policy creation failed");
                self.compensate(&uuid, &name).await;
                Err(e)
            }
        }
    }

    async fn is_visible(
        &self,
        uuid: &str,
        name: &str,
        group_type: GroupType,
    ) -> Result<bool, CoreError> {
        let page = with_timeout(
            self.config.call_timeout,
            self.gateway.list_address_groups(
                name,
                Some(group_type),
                1,
                self.config.group_page_size.max(1),
            ),
        )
        .await?;
        Ok(page.groups.iter().any(|g| g.uuid == uuid || g.name == name))
    }

    async fn compensate(&self, uuid: &str, name: &str) {
        match with_timeout(
            self.config.call_timeout,
            self.gateway.delete_address_group(uuid),
        )
        .await
        {
            Ok(()) => info!(group = %name, "rolled back address group"),
            Err(e) => error!(group = %name, error = %e, "rollback of address group failed"),
        }
    }

    /// The enforcing policy for a new group: the group sits on the source
    /// side for `in` and the destination side for `out`.
    pub fn paired_policy(
        &self,
        direction: Direction,
        group_type: GroupType,
        uuid: &str,
        name: &str,
    ) -> NewControlPolicy {
        let defaults = &self.config.policy;
        let (source_type, source, destination_type, destination) = match direction {
            Direction::In => (
                EndpointType::Group,
                uuid.to_owned(),
                EndpointType::Net,
                defaults.destination_any.clone(),
            ),
            Direction::Out => (
                EndpointType::Net,
                defaults.source_any.clone(),
                EndpointType::Group,
                uuid.to_owned(),
            ),
        };
        NewControlPolicy {
            priority: defaults.priority,
            direction,
            source_type,
            source,
            destination_type,
            destination,
            dest_port: defaults.dest_port.clone(),
            dest_port_type: defaults.dest_port_type.clone(),
            proto: defaults.proto_for(direction, group_type).to_owned(),
            action: defaults.action.clone(),
            description: name.to_owned(),
            enabled: defaults.enabled,
        }
    }

    // ── Unblock path ─────────────────────────────────────────────────

    /// Remove `targets` from whichever groups hold them. Each target is
    /// consumed by the first group containing it; targets found nowhere
    /// produce no record.
    pub async fn remove(
        &self,
        direction: Direction,
        groups: &[AddressGroup],
        targets: &[String],
    ) -> Vec<OutcomeRecord> {
        let mut open = vec![true; targets.len()];
        let mut records = Vec::new();

        for group in groups {
            let matched: Vec<&String> = targets
                .iter()
                .zip(open.iter_mut())
                .filter(|(target, open)| {
                    **open && group.members.iter().any(|m| equivalent(m, target))
                })
                .map(|(target, open)| {
                    *open = false;
                    target
                })
                .collect();
            if matched.is_empty() {
                continue;
            }

            let remaining: Vec<String> = group
                .members
                .iter()
                .filter(|m| !matched.iter().any(|t| equivalent(m, t)))
                .cloned()
                .collect();

            if remaining.is_empty() {
                records.extend(self.retire_group(direction, group, &matched).await);
            } else {
                records.extend(self.shrink_group(group, &matched, remaining).await);
            }
        }

        records
    }

    async fn shrink_group(
        &self,
        group: &AddressGroup,
        matched: &[&String],
        remaining: Vec<String>,
    ) -> Vec<OutcomeRecord> {
        let group_ref = GroupRef::from(group);
        let result = with_timeout(
            self.config.call_timeout,
            self.gateway.update_address_group(
                &group.uuid,
                &group.name,
                &group.description,
                &remaining,
            ),
        )
        .await;

        match result {
            Ok(()) => {
                info!(group = %group.name, removed = matched.len(), size = remaining.len(), "addresses removed");
                matched
                    .iter()
                    .map(|addr| {
                        OutcomeRecord::new(
                            addr.as_str(),
                            Outcome::Unblocked {
                                group: group_ref.clone(),
                                group_len: Some(remaining.len()),
                            },
                        )
                    })
                    .collect()
            }
            Err(e) => {
                error!(group = %group.name, error = %e, "group update failed");
                failed_all(matched, &group_ref, &e)
            }
        }
    }

    /// Delete the group's paired policies, then the group. A failed policy
    /// deletion leaves the group in place.
    async fn retire_group(
        &self,
        direction: Direction,
        group: &AddressGroup,
        matched: &[&String],
    ) -> Vec<OutcomeRecord> {
        let group_ref = GroupRef::from(group);

        let policies = match with_timeout(
            self.config.call_timeout,
            self.gateway
                .list_control_policies(direction, Some(&group.name)),
        )
        .await
        {
            Ok(policies) => policies,
            Err(e) => {
                error!(group = %group.name, error = %e, "policy lookup failed");
                return failed_all(matched, &group_ref, &e);
            }
        };

        for policy in policies.iter().filter(|p| p.is_paired_with(group)) {
            if let Err(e) = with_timeout(
                self.config.call_timeout,
                self.gateway.delete_control_policy(&policy.rule_id, direction),
            )
            .await
            {
                error!(group = %group.name, rule_id = %policy.rule_id, error = %e, "policy deletion failed");
                return failed_all(matched, &group_ref, &e);
            }
            info!(group = %group.name, rule_id = %policy.rule_id, "paired policy deleted");
        }

        match with_timeout(
            self.config.call_timeout,
            self.gateway.delete_address_group(&group.uuid),
        )
        .await
        {
            Ok(()) => {
                info!(group = %group.name, "empty address group deleted");
                matched
                    .iter()
                    .map(|addr| {
                        OutcomeRecord::new(
                            addr.as_str(),
                            Outcome::Unblocked {
                                group: group_ref.clone(),
                                group_len: None,
                            },
                        )
                    })
                    .collect()
            }
            Err(e) => {
                error!(group = %group.name, error = %e, "group deletion failed");
                failed_all(matched, &group_ref, &e)
            }
        }
    }
}

fn failed_all(matched: &[&String], group: &GroupRef, err: &CoreError) -> Vec<OutcomeRecord> {
    let reason = FailureReason::Gateway(err.to_string());
    matched
        .iter()
        .map(|addr| OutcomeRecord::failed(addr.as_str(), Some(group.clone()), reason.clone()))
        .collect()
}

/// Six random alphanumerics for a new group name.
fn random_suffix() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(SUFFIX_LEN)
        .map(|b| char::from(SUFFIX_ALPHABET[usize::from(*b) % SUFFIX_ALPHABET.len()]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_six_alphanumerics() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
