//! Shared helpers for command handlers.

use std::path::Path;

use crate::error::CliError;

/// Read and parse a JSON file for `--params-file`.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "params-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Parse an inline `--params` JSON object.
pub fn parse_json_arg(raw: &str) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: "params".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// `yes` / `no` for table cells.
pub fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.into()
}
