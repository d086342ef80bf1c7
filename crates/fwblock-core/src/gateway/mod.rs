// ── Firewall gateway contract ──
//
// The engine talks to the firewall only through `FirewallGateway`.
// `ApiGateway` is the HTTP implementation; tests plug in an in-memory
// fake. Every method is one round-trip.

mod api;

use std::future::Future;
use std::time::Duration;

use crate::error::CoreError;
use crate::model::{AddressGroup, ControlPolicy, Direction, EndpointType, GroupType};

pub use api::ApiGateway;

/// One page of an address-book listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPage {
    pub groups: Vec<AddressGroup>,
    pub total_count: u64,
}

/// Parameters for creating an address book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddressGroup {
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    pub members: Vec<String>,
}

/// Parameters for creating a control policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewControlPolicy {
    pub priority: i32,
    pub direction: Direction,
    pub source_type: EndpointType,
    pub source: String,
    pub destination_type: EndpointType,
    pub destination: String,
    pub dest_port: String,
    pub dest_port_type: String,
    pub proto: String,
    pub action: String,
    pub description: String,
    pub enabled: bool,
}

/// Address-book and control-policy CRUD against the cloud firewall.
pub trait FirewallGateway: Send + Sync {
    /// One page of address books whose name matches `query` (empty = all),
    /// optionally restricted to `group_type`. Pages are 1-based.
    fn list_address_groups(
        &self,
        query: &str,
        group_type: Option<GroupType>,
        page_number: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<GroupPage, CoreError>> + Send;

    /// Create an address book, returning its UUID.
    fn create_address_group(
        &self,
        group: &NewAddressGroup,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    /// Replace an address book's member list wholesale.
    fn update_address_group(
        &self,
        uuid: &str,
        name: &str,
        description: &str,
        members: &[String],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete_address_group(&self, uuid: &str)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Every policy in `direction`, optionally filtered by description.
    fn list_control_policies(
        &self,
        direction: Direction,
        description: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ControlPolicy>, CoreError>> + Send;

    /// Create a control policy, returning its rule id.
    fn create_control_policy(
        &self,
        policy: &NewControlPolicy,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    fn delete_control_policy(
        &self,
        rule_id: &str,
        direction: Direction,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Run a gateway call under `limit`. Hitting the limit is a
/// [`CoreError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: limit.as_secs(),
        }),
    }
}

/// Every address book matching `query` / `group_type`, walking pages of
/// `page_size` until a short page or the reported total, when there is one.
pub async fn collect_groups<G: FirewallGateway>(
    gateway: &G,
    query: &str,
    group_type: Option<GroupType>,
    page_size: u32,
    limit: Duration,
) -> Result<Vec<AddressGroup>, CoreError> {
    let page_size = page_size.max(1);
    let mut groups = Vec::new();
    let mut page_number = 1;

    loop {
        let page = with_timeout(
            limit,
            gateway.list_address_groups(query, group_type, page_number, page_size),
        )
        .await?;
        let received = page.groups.len();
        groups.extend(page.groups);

        // A zero total means the firewall left it out.
        if received == 0
            || received < usize::try_from(page_size).unwrap_or(usize::MAX)
            || (page.total_count > 0
                && u64::try_from(groups.len()).unwrap_or(u64::MAX) >= page.total_count)
        {
            return Ok(groups);
        }
        page_number += 1;
    }
}
