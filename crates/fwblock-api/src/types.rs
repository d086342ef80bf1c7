// Wire types for the firewall OpenAPI.
//
// Field names are PascalCase on the wire. List endpoints return
// `Data: null` when nothing matches, so every list is `#[serde(default)]`
// through `null_as_empty`.

use serde::{Deserialize, Deserializer, Serialize};

/// API version sent with every action.
pub const API_VERSION: &str = "2021-09-06";

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Envelope ─────────────────────────────────────────────────────────

/// `{"ResponseMetadata": {...}, "Result": {...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope<T> {
    pub response_metadata: ResponseMetadata,
    pub result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result body for mutating actions that return nothing of interest.
#[derive(Debug, Default, Deserialize)]
pub struct Empty {}

// ── Address books ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressBook {
    pub group_uuid: String,
    pub group_name: String,
    #[serde(default)]
    pub description: String,
    /// `ip`, `port`, or `domain`.
    pub group_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address_list: Vec<String>,
    /// Number of policies referencing this book.
    #[serde(default)]
    pub ref_cnt: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAddressBookRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_type: Option<&'a str>,
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressBookPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<AddressBook>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddAddressBookRequest<'a> {
    pub group_name: &'a str,
    pub group_type: &'a str,
    pub description: &'a str,
    pub address_list: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddAddressBookResponse {
    pub group_uuid: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyAddressBookRequest<'a> {
    pub group_uuid: &'a str,
    pub group_name: &'a str,
    pub description: &'a str,
    pub address_list: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteAddressBookRequest<'a> {
    pub group_uuid: &'a str,
}

// ── Control policies ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlPolicy {
    pub rule_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub destination_type: String,
    #[serde(default)]
    pub proto: String,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub prio: i32,
}

fn default_status() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeControlPolicyRequest<'a> {
    pub direction: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlPolicyPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<ControlPolicy>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddControlPolicyRequest<'a> {
    pub prio: i32,
    pub direction: &'a str,
    pub source_type: &'a str,
    pub source: &'a str,
    pub destination_type: &'a str,
    pub destination: &'a str,
    pub dest_port: &'a str,
    pub dest_port_type: &'a str,
    pub proto: &'a str,
    pub action: &'a str,
    pub description: &'a str,
    pub status: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddControlPolicyResponse {
    pub rule_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteControlPolicyRequest<'a> {
    pub rule_id: &'a str,
    pub direction: &'a str,
}
