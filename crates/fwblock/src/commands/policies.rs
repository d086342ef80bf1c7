//! Control policy command handlers.

use serde_json::json;
use tabled::Tabled;

use fwblock_core::gateway::with_timeout;
use fwblock_core::{
    ActionId, ControlPolicy, Direction, Engine, EndpointType, FirewallGateway, dispatch,
};

use crate::cli::{GlobalOpts, PoliciesArgs, PoliciesCommand};
use crate::error::CliError;
use crate::output;

use super::action::detail;
use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PolicyRow {
    #[tabled(rename = "Rule ID")]
    rule_id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Proto")]
    proto: String,
    #[tabled(rename = "Prio")]
    priority: i32,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&ControlPolicy> for PolicyRow {
    fn from(p: &ControlPolicy) -> Self {
        Self {
            rule_id: p.rule_id.clone(),
            description: p.description.clone(),
            action: p.action.clone(),
            source: format!("{}:{}", p.source_type, p.source),
            destination: format!("{}:{}", p.destination_type, p.destination),
            proto: p.proto.clone(),
            priority: p.priority,
            enabled: util::yes_no(p.enabled),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<G: FirewallGateway>(
    engine: &Engine<G>,
    args: PoliciesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PoliciesCommand::List {
            direction,
            description,
        } => {
            let policies = with_timeout(
                engine.config().call_timeout,
                engine
                    .gateway()
                    .list_control_policies(Direction::from(direction), description.as_deref()),
            )
            .await?;
            let out = output::render_list(
                &global.output,
                &policies,
                |p| PolicyRow::from(p),
                |p| p.rule_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PoliciesCommand::Create {
            direction,
            source_type,
            source,
            destination_type,
            destination,
            description,
            action,
            proto,
            priority,
        } => {
            let params = json!({
                "direction": Direction::from(direction),
                "source_type": EndpointType::from(source_type),
                "source": source,
                "destination_type": EndpointType::from(destination_type),
                "destination": destination,
                "description": description,
                "action": action,
                "proto": proto,
                "priority": priority,
            });
            let created = dispatch(engine, ActionId::AddControlPolicy, params).await?;
            let out = output::render_single(&global.output, &created, detail, |v| {
                v["ruleId"].as_str().unwrap_or_default().to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PoliciesCommand::Delete { rule_id, direction } => {
            let params = json!({
                "rule_id": rule_id,
                "direction": Direction::from(direction),
            });
            dispatch(engine, ActionId::DeleteControlPolicy, params).await?;
            if !global.quiet {
                eprintln!("Control policy {rule_id} deleted");
            }
            Ok(())
        }
    }
}
