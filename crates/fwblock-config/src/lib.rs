//! Configuration for fwblock.
//!
//! A TOML file layered with `FWBLOCK_` environment variables, read through
//! a dotted-key lookup with a `common` fallback section, and translated
//! into the typed `fwblock_core` configs the engine and gateway consume.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use fwblock_core::{ConnectionConfig, EngineConfig, PolicyDefaults, TlsVerification};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FWBLOCK_CONFIG";

/// Prefix for environment overrides; `__` separates nesting levels.
pub const ENV_PREFIX: &str = "FWBLOCK_";

/// `FWBLOCK_*` variables that belong to command-line flags, not the tree.
const FLAG_ENV_KEYS: &[&str] = &["config", "endpoint", "region", "api_key", "output", "instance"];

const COMMON_SECTION: &str = "common";
const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured (set connection.api_key or connection.api_key_env)")]
    NoCredentials,

    #[error("failed to render config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file: explicit path, then `$FWBLOCK_CONFIG`, then
/// the platform config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("io", "fwblock", "fwblock").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("fwblock");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Settings ────────────────────────────────────────────────────────

/// Where log output should additionally go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: Option<PathBuf>,
    pub instance: Option<String>,
}

/// Values that take precedence over the file and environment, typically
/// from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub api_key: Option<SecretString>,
    pub insecure: bool,
    pub timeout_secs: Option<u64>,
}

/// Merged configuration tree.
#[derive(Debug, Clone)]
pub struct Settings {
    figment: Figment,
    path: PathBuf,
}

impl Settings {
    /// Load the file at `path` (missing is fine) plus `FWBLOCK_*` env vars.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(FLAG_ENV_KEYS).split("__"));
        Self::validated(figment, path.to_path_buf())
    }

    /// Settings from an in-memory TOML document, without the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::validated(Figment::from(Toml::string(toml)), PathBuf::new())
    }

    fn validated(figment: Figment, path: PathBuf) -> Result<Self, ConfigError> {
        // Surface syntax errors now instead of silently falling back to defaults.
        figment.extract::<serde_json::Value>()?;
        Ok(Self { figment, path })
    }

    /// The file these settings were read from (empty for in-memory settings).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dotted-key lookup.
    ///
    /// Keys need at least a section and a field. When the section is
    /// missing entirely, the remaining segments are looked up under
    /// `common`. Anything else that misses yields `default`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let segments: Vec<&str> = key.split('.').collect();
        let [section, rest @ ..] = segments.as_slice() else {
            return default;
        };
        if rest.is_empty() {
            return default;
        }

        let resolved = if self.figment.contains(section) {
            key.to_owned()
        } else if self.figment.contains(COMMON_SECTION) {
            format!("{COMMON_SECTION}.{}", rest.join("."))
        } else {
            return default;
        };

        match self.figment.find_value(&resolved) {
            Ok(value) => value.deserialize().unwrap_or_else(|err| {
                warn!(key = %resolved, error = %err, "ignoring config value of the wrong type");
                default
            }),
            Err(_) => default,
        }
    }

    fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get::<Option<T>>(key, None)
    }

    // ── Typed views ──────────────────────────────────────────────────

    /// Engine tuning. Built once and handed to the engine.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let base = EngineConfig::default();
        let policy_base = PolicyDefaults::default();

        let placeholder: String = self.get(
            "add_address_book.addresslist",
            base.placeholder_members.join(","),
        );
        let placeholder_members = placeholder
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .collect();

        let config = EngineConfig {
            group_name_prefix: self.get("add_address_book.group_name_prefix", base.group_name_prefix),
            placeholder_members,
            max_addresses_per_group: self.get(
                "modify_address_book.max_addresses_per_group",
                base.max_addresses_per_group,
            ),
            group_page_size: self.get("describe_address_book.page_size", base.group_page_size),
            policy_page_size: self.get("describe_control_policy.page_size", base.policy_page_size),
            settle_delay: Duration::from_millis(self.get(
                "add_address_book.settle_delay_ms",
                duration_millis(base.settle_delay),
            )),
            call_timeout: Duration::from_secs(
                self.get("engine.call_timeout_secs", base.call_timeout.as_secs()),
            ),
            max_stalled_rounds: self.get("engine.max_stalled_rounds", base.max_stalled_rounds),
            policy: PolicyDefaults {
                action: self.get("add_control_policy.action", policy_base.action),
                proto: self.get("add_control_policy.proto", policy_base.proto),
                domain_proto: self.get("add_control_policy.domain_proto", policy_base.domain_proto),
                priority: self.get("add_control_policy.prio", policy_base.priority),
                dest_port: self.get("add_control_policy.dest_port", policy_base.dest_port),
                dest_port_type: self.get(
                    "add_control_policy.dest_port_type",
                    policy_base.dest_port_type,
                ),
                enabled: self.get("add_control_policy.status", policy_base.enabled),
                destination_any: self.get(
                    "add_control_policy.destination_any",
                    policy_base.destination_any,
                ),
                source_any: self.get("add_control_policy.source_any", policy_base.source_any),
            },
        };

        if config.new_group_capacity() == 0 {
            return Err(ConfigError::invalid(
                "modify_address_book.max_addresses_per_group",
                format!(
                    "must exceed the {} placeholder member(s) a new group starts with",
                    config.placeholder_members.len()
                ),
            ));
        }
        if config.group_page_size == 0 || config.policy_page_size == 0 {
            return Err(ConfigError::invalid("page_size", "must be at least 1"));
        }
        if config.max_stalled_rounds == 0 {
            return Err(ConfigError::invalid("engine.max_stalled_rounds", "must be at least 1"));
        }
        Ok(config)
    }

    /// Connection settings from file and environment only.
    pub fn connection(&self) -> Result<ConnectionConfig, ConfigError> {
        self.connection_with(&ConnectionOverrides::default())
    }

    /// Connection settings with command-line overrides applied on top.
    pub fn connection_with(
        &self,
        overrides: &ConnectionOverrides,
    ) -> Result<ConnectionConfig, ConfigError> {
        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| self.get_opt("connection.endpoint"))
            .ok_or_else(|| ConfigError::invalid("connection.endpoint", "not set"))?;
        let endpoint: url::Url = endpoint
            .parse()
            .map_err(|_| ConfigError::invalid("connection.endpoint", format!("invalid URL: {endpoint}")))?;

        let region = overrides
            .region
            .clone()
            .or_else(|| self.get_opt("connection.region"))
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ConfigError::invalid("connection.region", "not set"))?;

        let api_key = match &overrides.api_key {
            Some(key) => key.clone(),
            None => self.resolve_api_key()?,
        };

        let tls = if overrides.insecure || self.get("connection.insecure", false) {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ca) = self.get_opt::<PathBuf>("connection.ca_cert") {
            TlsVerification::CustomCa(ca)
        } else {
            TlsVerification::SystemDefaults
        };

        let timeout = Duration::from_secs(
            overrides
                .timeout_secs
                .unwrap_or_else(|| self.get("connection.timeout_secs", 30)),
        );

        Ok(ConnectionConfig {
            endpoint,
            region,
            api_key,
            tls,
            timeout,
            proxy: self.proxy()?,
        })
    }

    /// API key: the variable named by `connection.api_key_env`, then the
    /// plaintext `connection.api_key`.
    pub fn resolve_api_key(&self) -> Result<SecretString, ConfigError> {
        if let Some(env_name) = self.get_opt::<String>("connection.api_key_env") {
            if let Ok(val) = std::env::var(&env_name) {
                if !val.is_empty() {
                    return Ok(SecretString::from(val));
                }
            }
        }
        self.get_opt::<String>("connection.api_key")
            .filter(|k| !k.is_empty())
            .map(SecretString::from)
            .ok_or(ConfigError::NoCredentials)
    }

    fn proxy(&self) -> Result<Option<String>, ConfigError> {
        if !self.get("connection.proxy.enabled", false) {
            return Ok(None);
        }
        let kind: String = self.get("connection.proxy.kind", "http".to_owned());
        if kind != "http" && kind != "https" {
            return Err(ConfigError::invalid(
                "connection.proxy.kind",
                format!("expected 'http' or 'https', got '{kind}'"),
            ));
        }
        let host: String = self
            .get_opt("connection.proxy.host")
            .ok_or_else(|| ConfigError::invalid("connection.proxy.host", "not set"))?;
        let port: u16 = self
            .get_opt("connection.proxy.port")
            .ok_or_else(|| ConfigError::invalid("connection.proxy.port", "not set"))?;
        Ok(Some(format!("{kind}://{host}:{port}")))
    }

    pub fn logging(&self) -> LoggingSettings {
        LoggingSettings {
            directory: self.get_opt("logging.directory"),
            instance: self.get_opt::<String>("logging.instance").filter(|i| !i.is_empty()),
        }
    }

    /// The merged tree as TOML with the API key masked.
    pub fn redacted_toml(&self) -> Result<String, ConfigError> {
        let mut tree: toml::Table = self.figment.extract()?;
        for section in [COMMON_SECTION, "connection"] {
            if let Some(toml::Value::Table(table)) = tree.get_mut(section) {
                if let Some(key) = table.get_mut("api_key") {
                    *key = toml::Value::String(REDACTED.into());
                }
            }
        }
        Ok(toml::to_string_pretty(&tree)?)
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
        [common]
        page_size = 50
        prio = 7

        [add_address_book]
        group_name_prefix = "soar"
        addresslist = ""

        [modify_address_book]
        max_addresses_per_group = 100

        [connection]
        endpoint = "https://fw.example.com"
        region = "cn-north-1"
        api_key = "plain-key"

        [connection.proxy]
        enabled = true
        kind = "https"
        host = "10.0.0.8"
        port = 3128
    "#;

    fn sample() -> Settings {
        Settings::from_toml_str(SAMPLE).unwrap()
    }

    #[test]
    fn single_segment_key_returns_default() {
        assert_eq!(sample().get("connection", 5_u32), 5);
    }

    #[test]
    fn present_key_wins_over_common() {
        assert_eq!(sample().get("modify_address_book.max_addresses_per_group", 1_usize), 100);
    }

    #[test]
    fn missing_section_falls_back_to_common() {
        let settings = sample();
        assert_eq!(settings.get("describe_address_book.page_size", 500_u32), 50);
        assert_eq!(settings.get("add_control_policy.prio", 2_i32), 7);
    }

    #[test]
    fn missing_field_in_present_section_is_default() {
        // The section exists, so `common` is not consulted.
        assert_eq!(sample().get("add_address_book.page_size", 9_u32), 9);
    }

    #[test]
    fn no_common_section_means_default() {
        let settings = Settings::from_toml_str("[a]\nb = 1\n").unwrap();
        assert_eq!(settings.get("x.b", 3_i64), 3);
        assert_eq!(settings.get("a.b", 3_i64), 1);
    }

    #[test]
    fn wrong_type_yields_default() {
        let settings = Settings::from_toml_str("[engine]\nmax_stalled_rounds = \"lots\"\n").unwrap();
        assert_eq!(settings.get("engine.max_stalled_rounds", 2_u32), 2);
    }

    #[test]
    fn engine_config_reads_every_section() {
        let config = sample().engine_config().unwrap();
        assert_eq!(config.group_name_prefix, "soar");
        assert!(config.placeholder_members.is_empty());
        assert_eq!(config.max_addresses_per_group, 100);
        assert_eq!(config.group_page_size, 50);
        assert_eq!(config.policy_page_size, 50);
        assert_eq!(config.policy.priority, 7);
        assert_eq!(config.policy.action, "deny");
        assert_eq!(config.settle_delay, Duration::from_secs(5));
    }

    #[test]
    fn empty_settings_give_engine_defaults() {
        let config = Settings::from_toml_str("").unwrap().engine_config().unwrap();
        assert_eq!(config.placeholder_members, vec!["1.1.1.1/32".to_owned()]);
        assert_eq!(config.max_addresses_per_group, 2000);
        assert_eq!(config.call_timeout, Duration::from_secs(30));
        assert_eq!(config.max_stalled_rounds, 2);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let settings =
            Settings::from_toml_str("[modify_address_book]\nmax_addresses_per_group = 0\n").unwrap();
        assert!(matches!(
            settings.engine_config(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn capacity_must_exceed_placeholder() {
        let settings = Settings::from_toml_str(
            "[add_address_book]\naddresslist = \"1.1.1.1/32, 2.2.2.2/32\"\n\
             [modify_address_book]\nmax_addresses_per_group = 2\n",
        )
        .unwrap();
        assert!(matches!(
            settings.engine_config(),
            Err(ConfigError::Validation { ref field, .. })
                if field == "modify_address_book.max_addresses_per_group"
        ));

        let roomy = Settings::from_toml_str(
            "[add_address_book]\naddresslist = \"1.1.1.1/32\"\n\
             [modify_address_book]\nmax_addresses_per_group = 2\n",
        )
        .unwrap();
        assert_eq!(roomy.engine_config().unwrap().new_group_capacity(), 1);
    }

    #[test]
    fn single_stalled_round_is_accepted() {
        let settings = Settings::from_toml_str("[engine]\nmax_stalled_rounds = 1\n").unwrap();
        assert_eq!(settings.engine_config().unwrap().max_stalled_rounds, 1);
    }

    #[test]
    fn connection_builds_proxy_url() {
        let conn = sample().connection().unwrap();
        assert_eq!(conn.endpoint.as_str(), "https://fw.example.com/");
        assert_eq!(conn.region, "cn-north-1");
        assert_eq!(conn.api_key.expose_secret(), "plain-key");
        assert_eq!(conn.proxy.as_deref(), Some("https://10.0.0.8:3128"));
        assert_eq!(conn.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn disabled_proxy_is_ignored() {
        let settings = Settings::from_toml_str(
            "[connection]\nendpoint = \"https://fw\"\nregion = \"r\"\napi_key = \"k\"\n\
             [connection.proxy]\nenabled = false\nhost = \"h\"\nport = 1\n",
        )
        .unwrap();
        assert_eq!(settings.connection().unwrap().proxy, None);
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = ConnectionOverrides {
            endpoint: Some("https://other.example.com".into()),
            api_key: Some(SecretString::from("flag-key")),
            insecure: true,
            timeout_secs: Some(5),
            ..ConnectionOverrides::default()
        };
        let conn = sample().connection_with(&overrides).unwrap();
        assert_eq!(conn.endpoint.host_str(), Some("other.example.com"));
        assert_eq!(conn.api_key.expose_secret(), "flag-key");
        assert_eq!(conn.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(conn.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_key_is_no_credentials() {
        let settings =
            Settings::from_toml_str("[connection]\nendpoint = \"https://fw\"\nregion = \"r\"\n")
                .unwrap();
        assert!(matches!(settings.connection(), Err(ConfigError::NoCredentials)));
    }

    #[test]
    fn missing_endpoint_is_validation_error() {
        let err = Settings::from_toml_str("").unwrap().connection().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "connection.endpoint"));
    }

    #[test]
    fn custom_ca_is_used_when_not_insecure() {
        let settings = Settings::from_toml_str(
            "[connection]\nendpoint = \"https://fw\"\nregion = \"r\"\napi_key = \"k\"\nca_cert = \"/etc/ca.pem\"\n",
        )
        .unwrap();
        assert_eq!(
            settings.connection().unwrap().tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/ca.pem"))
        );
    }

    #[test]
    fn logging_section() {
        let settings =
            Settings::from_toml_str("[logging]\ndirectory = \"/var/log/fw\"\ninstance = \"\"\n")
                .unwrap();
        assert_eq!(
            settings.logging(),
            LoggingSettings {
                directory: Some(PathBuf::from("/var/log/fw")),
                instance: None,
            }
        );
    }

    #[test]
    fn redacted_toml_masks_the_key() {
        let rendered = sample().redacted_toml().unwrap();
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("plain-key"));
    }

    #[test]
    fn load_reads_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[add_address_book]\ngroup_name_prefix = \"file\"").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.path(), path.as_path());
        assert_eq!(settings.engine_config().unwrap().group_name_prefix, "file");

        let missing = Settings::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(missing.get("add_address_book.group_name_prefix", String::new()), "");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[broken\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/explicit.toml");
        assert_eq!(config_path(Some(p)), p);
    }
}
