//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use fwblock_config::ConfigError;
use fwblock_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// The batch ran but no address succeeded.
    pub const BATCH_FAILED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the firewall API at {url}")]
    #[diagnostic(
        code(fwblock::connection_failed),
        help(
            "Check the endpoint URL, proxy and network path.\n\
             For self-signed endpoints try --insecure (-k) or set connection.ca_cert."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fwblock::auth_failed),
        help("Verify the API key (--api-key, FWBLOCK_API_KEY, or connection.api_key_env).")
    )]
    AuthFailed { message: String },

    #[error("No API key configured")]
    #[diagnostic(
        code(fwblock::no_credentials),
        help(
            "Pass --api-key, set FWBLOCK_API_KEY, or set connection.api_key_env in {path}."
        )
    )]
    NoCredentials { path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(fwblock::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(fwblock::api_error))]
    ApiError { code: String, message: String },

    // ── Batch ────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(fwblock::batch_failed),
        help("No address in the batch succeeded; see the per-address results above.")
    )]
    BatchFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fwblock::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(code(fwblock::config), help("Config file: {path}"))]
    Config { message: String, path: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(fwblock::timeout),
        help("Raise --timeout or engine.call_timeout_secs, or check API responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(fwblock::json), help("Check the JSON parameters and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            Self::BatchFailed { .. } => exit_code::BATCH_FAILED,
            Self::ApiError { .. } | Self::Config { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// Attach the config path to configuration failures.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        let path = path.display().to_string();
        match err {
            ConfigError::NoCredentials => Self::NoCredentials { path },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config {
                message: other.to_string(),
                path,
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                resource_type: entity_type,
                identifier,
            },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Api { message, code, .. } => Self::ApiError {
                code: code.unwrap_or_else(|| "unknown".into()),
                message,
            },
            CoreError::Config { message } => Self::Config {
                message,
                path: String::new(),
            },
            CoreError::Internal(message) => Self::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::AuthenticationFailed {
                    message: "bad key".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::Timeout { timeout_secs: 30 }, exit_code::TIMEOUT),
            (CoreError::validation("nope"), exit_code::USAGE),
            (
                CoreError::NotFound {
                    entity_type: "address book".into(),
                    identifier: "u-1".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::ConnectionFailed {
                    url: "https://fw".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_key_is_an_auth_error() {
        let err = CliError::from_config(ConfigError::NoCredentials, std::path::Path::new("/x"));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
