// `FirewallGateway` over the HTTP OpenAPI client.

use fwblock_api::types::AddControlPolicyRequest;
use fwblock_api::{FirewallClient, TlsMode, TransportConfig};
use tracing::warn;

use super::{FirewallGateway, GroupPage, NewAddressGroup, NewControlPolicy};
use crate::config::{ConnectionConfig, TlsVerification};
use crate::convert::policy_from_wire;
use crate::error::CoreError;
use crate::model::{AddressGroup, ControlPolicy, Direction, GroupType};

/// HTTP-backed gateway.
pub struct ApiGateway {
    client: FirewallClient,
    policy_page_size: u32,
}

impl ApiGateway {
    pub fn new(client: FirewallClient, policy_page_size: u32) -> Self {
        Self {
            client,
            policy_page_size,
        }
    }

    /// Build the HTTP client from a connection config.
    pub fn connect(config: &ConnectionConfig, policy_page_size: u32) -> Result<Self, CoreError> {
        let tls = match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        let transport = TransportConfig {
            tls,
            timeout: config.timeout,
            proxy: config.proxy.clone(),
        };
        let client = FirewallClient::from_api_key(
            config.endpoint.as_str(),
            &config.region,
            &config.api_key,
            &transport,
        )?;
        Ok(Self::new(client, policy_page_size))
    }
}

impl FirewallGateway for ApiGateway {
    async fn list_address_groups(
        &self,
        query: &str,
        group_type: Option<GroupType>,
        page_number: u32,
        page_size: u32,
    ) -> Result<GroupPage, CoreError> {
        let query = (!query.is_empty()).then_some(query);
        let page = self
            .client
            .describe_address_book(query, group_type.map(GroupType::as_str), page_number, page_size)
            .await?;

        let groups = page
            .data
            .into_iter()
            .filter_map(|book| match AddressGroup::try_from(book) {
                Ok(group) => Some(group),
                Err(e) => {
                    warn!(error = %e, "skipping address book");
                    None
                }
            })
            .collect();

        Ok(GroupPage {
            groups,
            total_count: page.total_count,
        })
    }

    async fn create_address_group(&self, group: &NewAddressGroup) -> Result<String, CoreError> {
        let created = self
            .client
            .add_address_book(
                &group.name,
                group.group_type.as_str(),
                &group.description,
                &group.members,
            )
            .await?;
        Ok(created.group_uuid)
    }

    async fn update_address_group(
        &self,
        uuid: &str,
        name: &str,
        description: &str,
        members: &[String],
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .modify_address_book(uuid, name, description, members)
            .await?)
    }

    async fn delete_address_group(&self, uuid: &str) -> Result<(), CoreError> {
        Ok(self.client.delete_address_book(uuid).await?)
    }

    async fn list_control_policies(
        &self,
        direction: Direction,
        description: Option<&str>,
    ) -> Result<Vec<ControlPolicy>, CoreError> {
        let policies = self
            .client
            .list_control_policies(direction.as_str(), description, self.policy_page_size)
            .await?;
        Ok(policies
            .into_iter()
            .map(|p| policy_from_wire(p, direction))
            .collect())
    }

    async fn create_control_policy(&self, policy: &NewControlPolicy) -> Result<String, CoreError> {
        let req = AddControlPolicyRequest {
            prio: policy.priority,
            direction: policy.direction.as_str(),
            source_type: policy.source_type.as_str(),
            source: &policy.source,
            destination_type: policy.destination_type.as_str(),
            destination: &policy.destination,
            dest_port: &policy.dest_port,
            dest_port_type: &policy.dest_port_type,
            proto: &policy.proto,
            action: &policy.action,
            description: &policy.description,
            status: policy.enabled,
        };
        Ok(self.client.add_control_policy(&req).await?.rule_id)
    }

    async fn delete_control_policy(&self, rule_id: &str, direction: Direction) -> Result<(), CoreError> {
        Ok(self
            .client
            .delete_control_policy(rule_id, direction.as_str())
            .await?)
    }
}
