// ── API-to-domain type conversions ──
//
// Bridges raw `fwblock_api::types` into `crate::model`. Address books of a
// type the engine does not know are rejected so callers can skip them.

use fwblock_api::types::{AddressBook, ControlPolicy as WirePolicy};

use crate::error::CoreError;
use crate::model::{AddressGroup, ControlPolicy, Direction, GroupType};

impl TryFrom<AddressBook> for AddressGroup {
    type Error = CoreError;

    fn try_from(book: AddressBook) -> Result<Self, Self::Error> {
        let group_type: GroupType = book.group_type.parse().map_err(|_| {
            CoreError::Internal(format!(
                "address book {} has unknown type `{}`",
                book.group_uuid, book.group_type
            ))
        })?;
        Ok(Self {
            uuid: book.group_uuid,
            name: book.group_name,
            description: book.description,
            group_type,
            members: book.address_list,
            ref_count: book.ref_cnt,
        })
    }
}

/// Convert a listed policy. `queried` is the direction the listing was
/// scoped to, used when the payload omits its own.
pub fn policy_from_wire(policy: WirePolicy, queried: Direction) -> ControlPolicy {
    let direction = policy.direction.parse().unwrap_or(queried);
    ControlPolicy {
        rule_id: policy.rule_id,
        direction,
        action: policy.action,
        description: policy.description,
        source: policy.source,
        source_type: policy.source_type,
        destination: policy.destination,
        destination_type: policy.destination_type,
        proto: policy.proto,
        priority: policy.prio,
        enabled: policy.status,
    }
}
