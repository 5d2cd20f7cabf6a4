//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub gateway: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub messaging: MessagingConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Server configuration (for both API and Gateway)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// JWT configuration
///
/// Tokens are issued by the authentication service; this process only verifies them.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Staging, archival and delivery settings
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Lifetime of a staged record in the cache
    #[serde(default = "default_staging_ttl_secs")]
    pub staging_ttl_secs: u64,
    /// Age at which a staged message is moved to the database
    #[serde(default = "default_archive_after_secs")]
    pub archive_after_secs: u64,
    /// Period of the background sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// COUNT hint for each SCAN call
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
    /// Issue `CONFIG SET notify-keyspace-events Ex` at startup
    #[serde(default = "default_true")]
    pub configure_keyspace_events: bool,
    /// Subscribe to key expiry notifications
    #[serde(default = "default_true")]
    pub expiry_listener_enabled: bool,
    /// Delay before the expiry subscriber reconnects
    #[serde(default = "default_listener_reconnect_delay_ms")]
    pub listener_reconnect_delay_ms: u64,
    /// Per-connection outbound queue capacity
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            staging_ttl_secs: default_staging_ttl_secs(),
            archive_after_secs: default_archive_after_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            scan_batch_size: default_scan_batch_size(),
            configure_keyspace_events: true,
            expiry_listener_enabled: true,
            listener_reconnect_delay_ms: default_listener_reconnect_delay_ms(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl MessagingConfig {
    #[must_use]
    pub fn staging_ttl(&self) -> Duration {
        Duration::from_secs(self.staging_ttl_secs)
    }

    #[must_use]
    pub fn archive_after(&self) -> Duration {
        Duration::from_secs(self.archive_after_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    #[must_use]
    pub fn listener_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.listener_reconnect_delay_ms)
    }

    /// Check the timing relationships the pipeline relies on
    ///
    /// A staged record must live long enough for at least one sweep to run after
    /// it has crossed the archival threshold, otherwise it could expire unarchived.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the offending variable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive_after_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ARCHIVE_AFTER_SECS",
                "must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS",
                "must be greater than zero".to_string(),
            ));
        }
        let Some(minimum_ttl) = self
            .archive_after_secs
            .checked_add(self.sweep_interval_secs)
        else {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS",
                "ARCHIVE_AFTER_SECS + SWEEP_INTERVAL_SECS overflows".to_string(),
            ));
        };
        if self.staging_ttl_secs <= minimum_ttl {
            return Err(ConfigError::InvalidValue(
                "STAGING_TTL_SECS",
                format!(
                    "{} must exceed ARCHIVE_AFTER_SECS + SWEEP_INTERVAL_SECS ({minimum_ttl})",
                    self.staging_ttl_secs,
                ),
            ));
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "OUTBOUND_BUFFER",
                "must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_app_name() -> String {
    "relay".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_staging_ttl_secs() -> u64 {
    300
}

fn default_archive_after_secs() -> u64 {
    180
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_scan_batch_size() -> usize {
    100
}

fn default_listener_reconnect_delay_ms() -> u64 {
    1000
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_true() -> bool {
    true
}

/// Read and parse an optional variable; unparsable values fall back to the default
fn var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|s| match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or the
    /// messaging timings are inconsistent
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port: var("API_PORT").ok_or(ConfigError::MissingVar("API_PORT"))?,
            },
            gateway: ServerConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host()),
                port: var("GATEWAY_PORT").ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(default_max_connections),
                min_connections: var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(default_min_connections),
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                max_connections: var("REDIS_MAX_CONNECTIONS")
                    .unwrap_or_else(default_redis_max_connections),
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                access_token_expiry: var("JWT_ACCESS_TOKEN_EXPIRY")
                    .unwrap_or_else(default_access_token_expiry),
            },
            messaging: MessagingConfig {
                staging_ttl_secs: var("STAGING_TTL_SECS").unwrap_or_else(default_staging_ttl_secs),
                archive_after_secs: var("ARCHIVE_AFTER_SECS")
                    .unwrap_or_else(default_archive_after_secs),
                sweep_interval_secs: var("SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(default_sweep_interval_secs),
                scan_batch_size: var("SCAN_BATCH_SIZE").unwrap_or_else(default_scan_batch_size),
                configure_keyspace_events: flag("REDIS_CONFIGURE_KEYSPACE_EVENTS").unwrap_or(true),
                expiry_listener_enabled: flag("EXPIRY_LISTENER_ENABLED").unwrap_or(true),
                listener_reconnect_delay_ms: var("EXPIRY_LISTENER_RECONNECT_DELAY_MS")
                    .unwrap_or_else(default_listener_reconnect_delay_ms),
                outbound_buffer: var("OUTBOUND_BUFFER").unwrap_or_else(default_outbound_buffer),
            },
        };

        config.messaging.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
