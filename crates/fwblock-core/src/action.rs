// ── Action dispatch ──
//
// Host-plugin entry point: an action identifier plus a JSON parameter
// object. Each `ActionId` maps to one handler that deserializes its typed
// parameters, calls the gateway or the engine, and returns JSON.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::engine::{BatchMode, Engine};
use crate::error::CoreError;
use crate::gateway::{
    FirewallGateway, NewAddressGroup, NewControlPolicy, collect_groups, with_timeout,
};
use crate::model::{Direction, EndpointType, GroupType};

/// Every action the plugin surface accepts, by its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum ActionId {
    TestConnectivity,
    AddAddressBook,
    DeleteAddressBook,
    DescribeAddressBook,
    ModifyAddressBook,
    AddControlPolicy,
    DeleteControlPolicy,
    DescribeControlPolicy,
    AutoBlockTask,
    AutoUnblockTask,
}

impl ActionId {
    /// Parse an action identifier. Unknown identifiers are a validation error.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        raw.parse()
            .map_err(|_| CoreError::validation(format!("unknown action `{raw}`")))
    }
}

// ── Parameters ───────────────────────────────────────────────────────

/// An address list given either as one comma-separated string or as an
/// array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AddressListParam {
    Text(String),
    List(Vec<String>),
}

impl Default for AddressListParam {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl AddressListParam {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            Self::List(list) => list
                .into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddAddressBookParams {
    #[serde(alias = "groupname")]
    group_name: String,
    #[serde(alias = "grouptype", default = "default_group_type")]
    group_type: GroupType,
    #[serde(default)]
    description: Option<String>,
    #[serde(alias = "addresslist", default)]
    address_list: AddressListParam,
}

fn default_group_type() -> GroupType {
    GroupType::Ip
}

#[derive(Debug, Deserialize)]
struct DeleteAddressBookParams {
    #[serde(alias = "groupuuid")]
    group_uuid: String,
}

#[derive(Debug, Default, Deserialize)]
struct DescribeAddressBookParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(alias = "grouptype", default)]
    group_type: Option<GroupType>,
}

#[derive(Debug, Deserialize)]
struct ModifyAddressBookParams {
    #[serde(alias = "groupuuid")]
    group_uuid: String,
    #[serde(alias = "groupname")]
    group_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(alias = "addresslist", default)]
    address_list: AddressListParam,
}

#[derive(Debug, Deserialize)]
struct AddControlPolicyParams {
    direction: String,
    #[serde(alias = "sourcetype")]
    source_type: String,
    source: String,
    #[serde(alias = "destinationtype")]
    destination_type: String,
    destination: String,
    description: String,
    #[serde(alias = "aclaction", default)]
    action: Option<String>,
    #[serde(default)]
    proto: Option<String>,
    #[serde(alias = "neworder", alias = "prio", default)]
    priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct DeleteControlPolicyParams {
    #[serde(alias = "acluuid")]
    rule_id: String,
    direction: String,
}

#[derive(Debug, Deserialize)]
struct DescribeControlPolicyParams {
    direction: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchParams {
    #[serde(alias = "address", alias = "addresses")]
    addr: String,
    direction: String,
}

fn params<T: DeserializeOwned>(action: ActionId, value: Value) -> Result<T, CoreError> {
    let value = if value.is_null() { json!({}) } else { value };
    serde_json::from_value(value)
        .map_err(|e| CoreError::validation(format!("invalid parameters for {action}: {e}")))
}

fn endpoint_type(raw: &str) -> Result<EndpointType, CoreError> {
    raw.parse()
        .map_err(|_| CoreError::validation(format!("unknown endpoint type `{raw}`")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(|e| CoreError::Internal(e.to_string()))
}

// ── Dispatch ─────────────────────────────────────────────────────────

/// Run `action` with JSON `params` against `engine`.
pub async fn dispatch<G: FirewallGateway>(
    engine: &Engine<G>,
    action: ActionId,
    params_value: Value,
) -> Result<Value, CoreError> {
    debug!(%action, "dispatching action");
    match action {
        ActionId::TestConnectivity => test_connectivity(engine).await,
        ActionId::AddAddressBook => add_address_book(engine, params(action, params_value)?).await,
        ActionId::DeleteAddressBook => {
            delete_address_book(engine, params(action, params_value)?).await
        }
        ActionId::DescribeAddressBook => {
            describe_address_book(engine, params(action, params_value)?).await
        }
        ActionId::ModifyAddressBook => {
            modify_address_book(engine, params(action, params_value)?).await
        }
        ActionId::AddControlPolicy => {
            add_control_policy(engine, params(action, params_value)?).await
        }
        ActionId::DeleteControlPolicy => {
            delete_control_policy(engine, params(action, params_value)?).await
        }
        ActionId::DescribeControlPolicy => {
            describe_control_policy(engine, params(action, params_value)?).await
        }
        ActionId::AutoBlockTask => {
            run_batch(engine, BatchMode::Block, params(action, params_value)?).await
        }
        ActionId::AutoUnblockTask => {
            run_batch(engine, BatchMode::Unblock, params(action, params_value)?).await
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn test_connectivity<G: FirewallGateway>(engine: &Engine<G>) -> Result<Value, CoreError> {
    let page = with_timeout(
        engine.config().call_timeout,
        engine.gateway().list_address_groups("", None, 1, 1),
    )
    .await?;
    Ok(json!({ "connected": true, "totalCount": page.total_count }))
}

async fn add_address_book<G: FirewallGateway>(
    engine: &Engine<G>,
    p: AddAddressBookParams,
) -> Result<Value, CoreError> {
    if p.group_name.trim().is_empty() {
        return Err(CoreError::validation("group_name must not be empty"));
    }
    let group = NewAddressGroup {
        description: p.description.unwrap_or_else(|| p.group_name.clone()),
        name: p.group_name,
        group_type: p.group_type,
        members: p.address_list.into_vec(),
    };
    let uuid = with_timeout(
        engine.config().call_timeout,
        engine.gateway().create_address_group(&group),
    )
    .await?;
    Ok(json!({
        "groupUuid": uuid,
        "groupName": group.name,
        "description": group.description,
    }))
}

async fn delete_address_book<G: FirewallGateway>(
    engine: &Engine<G>,
    p: DeleteAddressBookParams,
) -> Result<Value, CoreError> {
    with_timeout(
        engine.config().call_timeout,
        engine.gateway().delete_address_group(&p.group_uuid),
    )
    .await?;
    Ok(json!({ "groupUuid": p.group_uuid, "deleted": true }))
}

async fn describe_address_book<G: FirewallGateway>(
    engine: &Engine<G>,
    p: DescribeAddressBookParams,
) -> Result<Value, CoreError> {
    let config = engine.config();
    let groups = collect_groups(
        engine.gateway(),
        p.query.as_deref().unwrap_or_default(),
        p.group_type,
        config.group_page_size,
        config.call_timeout,
    )
    .await?;
    to_json(&groups)
}

async fn modify_address_book<G: FirewallGateway>(
    engine: &Engine<G>,
    p: ModifyAddressBookParams,
) -> Result<Value, CoreError> {
    let description = p.description.unwrap_or_else(|| p.group_name.clone());
    let members = p.address_list.into_vec();
    with_timeout(
        engine.config().call_timeout,
        engine
            .gateway()
            .update_address_group(&p.group_uuid, &p.group_name, &description, &members),
    )
    .await?;
    Ok(json!({
        "groupUuid": p.group_uuid,
        "groupName": p.group_name,
        "size": members.len(),
    }))
}

async fn add_control_policy<G: FirewallGateway>(
    engine: &Engine<G>,
    p: AddControlPolicyParams,
) -> Result<Value, CoreError> {
    let defaults = &engine.config().policy;
    let policy = NewControlPolicy {
        priority: p.priority.unwrap_or(defaults.priority),
        direction: Direction::parse(&p.direction)?,
        source_type: endpoint_type(&p.source_type)?,
        source: p.source,
        destination_type: endpoint_type(&p.destination_type)?,
        destination: p.destination,
        dest_port: defaults.dest_port.clone(),
        dest_port_type: defaults.dest_port_type.clone(),
        proto: p.proto.unwrap_or_else(|| defaults.proto.clone()),
        action: p.action.unwrap_or_else(|| defaults.action.clone()),
        description: p.description,
        enabled: defaults.enabled,
    };
    let rule_id = with_timeout(
        engine.config().call_timeout,
        engine.gateway().create_control_policy(&policy),
    )
    .await?;
    Ok(json!({ "ruleId": rule_id, "description": policy.description }))
}

async fn delete_control_policy<G: FirewallGateway>(
    engine: &Engine<G>,
    p: DeleteControlPolicyParams,
) -> Result<Value, CoreError> {
    let direction = Direction::parse(&p.direction)?;
    with_timeout(
        engine.config().call_timeout,
        engine.gateway().delete_control_policy(&p.rule_id, direction),
    )
    .await?;
    Ok(json!({ "ruleId": p.rule_id, "deleted": true }))
}

async fn describe_control_policy<G: FirewallGateway>(
    engine: &Engine<G>,
    p: DescribeControlPolicyParams,
) -> Result<Value, CoreError> {
    let direction = Direction::parse(&p.direction)?;
    let policies = with_timeout(
        engine.config().call_timeout,
        engine
            .gateway()
            .list_control_policies(direction, p.description.as_deref()),
    )
    .await?;
    to_json(&policies)
}

async fn run_batch<G: FirewallGateway>(
    engine: &Engine<G>,
    mode: BatchMode,
    p: BatchParams,
) -> Result<Value, CoreError> {
    let report = engine.run(mode, &p.direction, &p.addr).await?;
    to_json(&report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_action_round_trips_through_its_identifier() {
        for action in ActionId::iter() {
            assert_eq!(ActionId::parse(&action.to_string()).unwrap(), action);
        }
        assert_eq!(ActionId::parse("AutoBlockTask").unwrap(), ActionId::AutoBlockTask);
    }

    #[test]
    fn unknown_action_is_validation_error() {
        assert!(matches!(
            ActionId::parse("ModifyControlPolicy"),
            Err(CoreError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn address_list_accepts_text_or_array() {
        let text: AddressListParam = serde_json::from_value(json!("1.1.1.1, 2.2.2.2,")).unwrap();
        assert_eq!(text.into_vec(), vec!["1.1.1.1", "2.2.2.2"]);
        let list: AddressListParam = serde_json::from_value(json!([" a.com ", ""])).unwrap();
        assert_eq!(list.into_vec(), vec!["a.com"]);
    }

    #[test]
    fn legacy_parameter_names_are_accepted() {
        let p: AddAddressBookParams = params(
            ActionId::AddAddressBook,
            json!({ "groupname": "g", "grouptype": "domain", "addresslist": "a.com" }),
        )
        .unwrap();
        assert_eq!(p.group_name, "g");
        assert_eq!(p.group_type, GroupType::Domain);

        let p: DeleteControlPolicyParams = params(
            ActionId::DeleteControlPolicy,
            json!({ "acluuid": "r-1", "direction": "in" }),
        )
        .unwrap();
        assert_eq!(p.rule_id, "r-1");
    }

    #[test]
    fn missing_parameters_are_validation_errors() {
        let err = params::<BatchParams>(ActionId::AutoBlockTask, json!({ "direction": "in" }))
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }
}
