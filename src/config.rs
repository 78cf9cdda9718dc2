use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const DEFAULT_TRACKING_ID_MAX_ATTEMPTS: u32 = 8;

/// Application configuration with validation.
///
/// Values are layered from `config/default.toml`, then
/// `config/{environment}.toml`, then `WAREHOUSE_*` environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL (Postgres in production, SQLite in tests).
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Runtime environment name: "development", "test", or "production".
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Default log filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Run migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,

    /// Products with quantity below this count as "low stock" on the
    /// dashboard.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,

    /// When false (the default), a payment against a completed or refunded
    /// order reports "not found", indistinguishable from a missing id. When
    /// true, closed orders surface a distinct invalid-operation error.
    #[serde(default)]
    pub strict_payment_lookup: bool,

    /// Upper bound on tracking-id generation retries before the order is
    /// rejected with a conflict.
    #[serde(default = "default_tracking_id_max_attempts")]
    pub tracking_id_max_attempts: u32,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_connections() -> u32 {
    DEFAULT_DB_MIN_CONNECTIONS
}

fn default_low_stock_threshold() -> i32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

fn default_tracking_id_max_attempts() -> u32 {
    DEFAULT_TRACKING_ID_MAX_ATTEMPTS
}

impl AppConfig {
    /// Loads configuration from files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("WAREHOUSE_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
            .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
            .add_source(Environment::with_prefix("WAREHOUSE").separator("__"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(app_config)
    }

    /// Minimal configuration for tests and embedded use.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            db_max_connections: 1,
            db_min_connections: 1,
            auto_migrate: true,
            low_stock_threshold: default_low_stock_threshold(),
            strict_payment_lookup: false,
            tracking_id_max_attempts: default_tracking_id_max_attempts(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
