use thiserror::Error;

/// Top-level error type for the `fwblock-api` crate.
///
/// Covers every failure mode of the firewall OpenAPI surface:
/// authentication, transport, the `ResponseMetadata.Error` envelope, and
/// body decoding. `fwblock-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected by the endpoint (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS, proxy, or client-builder error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Throttled by the endpoint. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── API ─────────────────────────────────────────────────────────
    /// Error reported by the API, either through the envelope's
    /// `ResponseMetadata.Error` object or a non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
        request_id: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            Self::Api {
                code: Some(code), ..
            } => code.contains("NotFound"),
            _ => false,
        }
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    fn api(status: u16, code: Option<&str>) -> Error {
        Error::Api {
            message: "boom".into(),
            code: code.map(String::from),
            status,
            request_id: None,
        }
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(api(503, None).is_transient());
        assert!(!api(400, None).is_transient());
        assert!(Error::RateLimited { retry_after_secs: 1 }.is_transient());
    }

    #[test]
    fn not_found_by_status_or_code() {
        assert!(api(404, None).is_not_found());
        assert!(api(200, Some("InvalidAddressBook.NotFound")).is_not_found());
        assert!(!api(200, Some("InvalidParameter")).is_not_found());
    }

    #[test]
    fn api_error_code_is_exposed() {
        assert_eq!(api(400, Some("Throttling")).api_error_code(), Some("Throttling"));
        assert_eq!(Error::Tls("x".into()).api_error_code(), None);
    }
}
