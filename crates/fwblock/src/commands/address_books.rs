//! Address book command handlers.

use serde_json::{Value, json};
use tabled::Tabled;

use fwblock_core::gateway::collect_groups;
use fwblock_core::{ActionId, AddressGroup, Engine, FirewallGateway, GroupType, dispatch};

use crate::cli::{AddressBooksArgs, AddressBooksCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::action::detail;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AddressBookRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    group_type: &'static str,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Refs")]
    ref_count: u32,
}

impl From<&AddressGroup> for AddressBookRow {
    fn from(g: &AddressGroup) -> Self {
        Self {
            uuid: g.uuid.clone(),
            name: g.name.clone(),
            group_type: g.group_type.as_str(),
            members: g.members.len(),
            ref_count: g.ref_count,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<G: FirewallGateway>(
    engine: &Engine<G>,
    args: AddressBooksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AddressBooksCommand::List { query, group_type } => {
            let config = engine.config();
            let groups = collect_groups(
                engine.gateway(),
                query.as_deref().unwrap_or_default(),
                group_type.map(GroupType::from),
                config.group_page_size,
                config.call_timeout,
            )
            .await?;
            let out = output::render_list(
                &global.output,
                &groups,
                |g| AddressBookRow::from(g),
                |g| g.uuid.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AddressBooksCommand::Create {
            name,
            group_type,
            description,
            addresses,
        } => {
            let params = json!({
                "group_name": name,
                "group_type": GroupType::from(group_type),
                "description": description,
                "address_list": addresses,
            });
            let created = dispatch(engine, ActionId::AddAddressBook, params).await?;
            print_result(&created, "groupUuid", global)
        }

        AddressBooksCommand::Update {
            uuid,
            name,
            description,
            addresses,
        } => {
            let params = json!({
                "group_uuid": uuid,
                "group_name": name,
                "description": description,
                "address_list": addresses,
            });
            let updated = dispatch(engine, ActionId::ModifyAddressBook, params).await?;
            print_result(&updated, "groupUuid", global)
        }

        AddressBooksCommand::Delete { uuid } => {
            dispatch(engine, ActionId::DeleteAddressBook, json!({ "group_uuid": uuid })).await?;
            if !global.quiet {
                eprintln!("Address book {uuid} deleted");
            }
            Ok(())
        }
    }
}

fn print_result(value: &Value, id_key: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, value, detail, |v| {
        v.get(id_key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
