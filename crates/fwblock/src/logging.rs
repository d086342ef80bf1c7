//! Tracing setup: stderr always, plus a per-instance log file when a log
//! directory is configured.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const APP_ID: &str = "fwblock";

/// Install the global subscriber. Hold the returned guard until exit so
/// buffered file output is flushed.
pub fn init(verbosity: u8, log_dir: Option<&Path>, instance: Option<&str>) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_dir.and_then(|dir| open_log_file(dir, instance)) {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

fn open_log_file(
    dir: &Path,
    instance: Option<&str>,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("warning: cannot create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::never(dir, log_file_name(instance));
    Some(tracing_appender::non_blocking(appender))
}

/// `{app}_{instance}.log`, or `{app}.log` without an instance.
pub fn log_file_name(instance: Option<&str>) -> String {
    match instance {
        Some(name) => format!("{APP_ID}_{}.log", clean_instance(name)),
        None => format!("{APP_ID}.log"),
    }
}

/// Full path of the log file for `dir` and `instance`.
pub fn log_file_path(dir: &Path, instance: Option<&str>) -> PathBuf {
    dir.join(log_file_name(instance))
}

/// Make an instance name safe for a file name.
///
/// Lowercases, maps everything outside `[a-z0-9_.-]` to `_`, collapses
/// runs of `_` and trims them from both ends. An empty result is `default`.
pub fn clean_instance(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "default".into()
    } else {
        trimmed.to_owned()
    }
}
