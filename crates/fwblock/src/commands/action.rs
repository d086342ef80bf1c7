//! `fwblock action <ID>`: run any named action with JSON parameters.

use serde_json::Value;

use fwblock_core::{ActionId, Engine, FirewallGateway, dispatch};

use crate::cli::{ActionArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

/// Key/value view of a JSON result for table output.
pub fn detail(value: &Value) -> String {
    let Value::Object(map) = value else {
        return serde_json::to_string_pretty(value).unwrap_or_default();
    };
    let width = map.keys().map(String::len).max().unwrap_or(0) + 1;
    map.iter()
        .map(|(key, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                Value::Null => "-".into(),
                other => other.to_string(),
            };
            format!("{:<width$} {rendered}", format!("{key}:"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle<G: FirewallGateway>(
    engine: &Engine<G>,
    args: ActionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let action = ActionId::parse(&args.action_id)?;
    let params = match (&args.params, &args.params_file) {
        (Some(raw), _) => util::parse_json_arg(raw)?,
        (None, Some(path)) => util::read_json_file(path)?,
        (None, None) => Value::Null,
    };

    let result = dispatch(engine, action, params).await?;

    let out = output::render_single(&global.output, &result, detail, |v| match v {
        Value::Array(items) => items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })?;
    output::print_output(&out, global.quiet);

    // Batch actions report their own failure through statusCode.
    if matches!(action, ActionId::AutoBlockTask | ActionId::AutoUnblockTask)
        && result.get("statusCode").and_then(Value::as_u64) == Some(400)
    {
        return Err(CliError::BatchFailed {
            message: result["message"].as_str().unwrap_or_default().to_owned(),
        });
    }
    Ok(())
}
