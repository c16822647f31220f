//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Object store configuration.
    pub storage: StorageSettings,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogSettings,
}

/// Which object store client backs the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenStack Swift over HTTP.
    #[default]
    Swift,
    /// In-process store (development and tests only).
    Memory,
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Client implementation.
    #[serde(default)]
    pub provider: ProviderKind,
    /// Container holding every blob of this deployment.
    pub container: String,
    /// Account storage URL, e.g. `https://swift.example.com/v1/AUTH_tenant`.
    pub storage_url: String,
    /// Pre-issued auth token sent as `X-Auth-Token`.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Account temp-URL key used to sign temporary URLs.
    pub temp_url_key: String,
    /// Per-connection overrides.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

/// Per-connection overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionSettings {
    /// Size of the chunks handed to streaming download sinks.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Verify the store's TLS certificate.
    #[serde(default = "default_ssl_verify_peer")]
    pub ssl_verify_peer: bool,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_ssl_verify_peer() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            ssl_verify_peer: default_ssl_verify_peer(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_filter() -> String {
    "swiftblob=info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("SWIFTBLOB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
