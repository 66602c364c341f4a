//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Billing engine configuration.
    #[serde(default)]
    pub billing: BillingConfig,
    /// HTTP API configuration.
    #[serde(default)]
    pub api: ApiConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Billing engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Number of communities billed concurrently.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    /// Upper bound for a single store call made by the generator.
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,
    /// Whether the server runs the daily billing job.
    #[serde(default)]
    pub schedule_enabled: bool,
    /// UTC hour at or after which the daily billing job fires.
    #[serde(default = "default_schedule_hour")]
    pub schedule_hour_utc: u32,
}

impl BillingConfig {
    /// Store call timeout as a `Duration`.
    #[must_use]
    pub const fn persist_timeout(&self) -> Duration {
        Duration::from_secs(self.persist_timeout_secs)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: default_worker_concurrency(),
            persist_timeout_secs: default_persist_timeout(),
            schedule_enabled: false,
            schedule_hour_utc: default_schedule_hour(),
        }
    }
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_persist_timeout() -> u64 {
    30
}

fn default_schedule_hour() -> u32 {
    5
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Shared key required on internal routes. Internal routes are disabled when unset.
    #[serde(default)]
    pub internal_api_key: Option<String>,
    /// Time-to-live for cached ledger summaries.
    #[serde(default = "default_ledger_cache_ttl")]
    pub ledger_cache_ttl_secs: u64,
    /// Maximum number of cached ledger summaries.
    #[serde(default = "default_ledger_cache_capacity")]
    pub ledger_cache_capacity: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            internal_api_key: None,
            ledger_cache_ttl_secs: default_ledger_cache_ttl(),
            ledger_cache_capacity: default_ledger_cache_capacity(),
        }
    }
}

fn default_ledger_cache_ttl() -> u64 {
    20
}

fn default_ledger_cache_capacity() -> u64 {
    1000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Later sources win: `config/default`, `config/{RUN_MODE}`, then
    /// `RESIDIA__SECTION__KEY` environment variables.
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
                config::Environment::with_prefix("RESIDIA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
