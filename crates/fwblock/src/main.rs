mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use fwblock_config::Settings;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let path = fwblock_config::config_path(cli.global.config.as_deref());
    let settings = Settings::load(&path);

    // Logging comes up before anything can fail so config errors are traced too.
    let log = settings.as_ref().map(Settings::logging).unwrap_or_default();
    let instance = cli.global.instance.clone().or(log.instance);
    let guard = logging::init(cli.global.verbose, log.directory.as_deref(), instance.as_deref());

    let result = match settings {
        Ok(settings) => run(cli, &settings).await,
        Err(err) => Err(CliError::from_config(err, &path)),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        tracing::debug!(code, error = %err, "exiting with error");
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

async fn run(cli: Cli, settings: &Settings) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a firewall connection
        Command::Config(ref args) => commands::config_cmd::handle(args, settings, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "fwblock", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let engine = commands::connect(settings, &cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &engine, &cli.global).await
        }
    }
}
