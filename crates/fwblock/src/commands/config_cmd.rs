//! Config subcommand handlers.

use fwblock_config::Settings;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::logging;
use crate::output;

pub fn handle(args: &ConfigArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let rendered = settings
                .redacted_toml()
                .map_err(|e| CliError::from_config(e, settings.path()))?;
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let mut lines = vec![settings.path().display().to_string()];
            let log = settings.logging();
            if let Some(dir) = log.directory {
                let instance = global.instance.as_deref().or(log.instance.as_deref());
                lines.push(logging::log_file_path(&dir, instance).display().to_string());
            }
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }
    }
}
