//! Command dispatch: bridges CLI args -> engine / gateway -> output formatting.

pub mod action;
pub mod address_books;
pub mod block;
pub mod config_cmd;
pub mod policies;
pub mod util;

use secrecy::SecretString;

use fwblock_config::{ConnectionOverrides, Settings};
use fwblock_core::{ApiGateway, BatchMode, Engine, FirewallGateway};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Build the HTTP-backed engine from settings plus global flag overrides.
pub fn connect(settings: &Settings, global: &GlobalOpts) -> Result<Engine<ApiGateway>, CliError> {
    let engine_config = settings
        .engine_config()
        .map_err(|e| CliError::from_config(e, settings.path()))?;

    let overrides = ConnectionOverrides {
        endpoint: global.endpoint.clone(),
        region: global.region.clone(),
        api_key: global.api_key.clone().map(SecretString::from),
        insecure: global.insecure,
        timeout_secs: global.timeout,
    };
    let connection = settings
        .connection_with(&overrides)
        .map_err(|e| CliError::from_config(e, settings.path()))?;

    tracing::debug!(endpoint = %connection.endpoint, region = %connection.region, "connecting");
    let gateway = ApiGateway::connect(&connection, engine_config.policy_page_size)?;
    Ok(Engine::new(gateway, engine_config))
}

/// Dispatch a firewall-bound command to the appropriate handler.
pub async fn dispatch<G: FirewallGateway>(
    cmd: Command,
    engine: &Engine<G>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Block(args) => block::handle(engine, BatchMode::Block, args, global).await,
        Command::Unblock(args) => block::handle(engine, BatchMode::Unblock, args, global).await,
        Command::AddressBooks(args) => address_books::handle(engine, args, global).await,
        Command::Policies(args) => policies::handle(engine, args, global).await,
        Command::Action(args) => action::handle(engine, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
