//! API configuration
//!
//! Loaded from `CABINET_*` environment variables (after `.env`, when the
//! binary finds one). Every key has a default so a bare development
//! environment starts.

use serde::Deserialize;

use core_kernel::{CoreError, Timezone};
use domain_billing::ReminderGatewayConfig;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    pub log_format: LogFormat,
    /// IANA zone used to compute "today"
    pub timezone: String,
    /// Lifetime of cached client listings
    pub cache_ttl_secs: u64,
    /// Notification function that delivers reminders; reminders are
    /// disabled when unset
    pub reminder_endpoint: Option<String>,
    pub reminder_api_key: Option<String>,
    pub reminder_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/cabinet".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            timezone: core_kernel::calendar::DEFAULT_TIMEZONE.to_string(),
            cache_ttl_secs: 30,
            reminder_endpoint: None,
            reminder_api_key: None,
            reminder_timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `CABINET_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_secs", defaults.jwt_expiration_secs)?
            .set_default("database_url", defaults.database_url)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", "pretty")?
            .set_default("timezone", defaults.timezone)?
            .set_default("cache_ttl_secs", defaults.cache_ttl_secs)?
            .set_default("reminder_timeout_secs", defaults.reminder_timeout_secs)?
            .add_source(config::Environment::with_prefix("CABINET").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timezone(&self) -> Result<Timezone, CoreError> {
        Timezone::parse(&self.timezone)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    /// Gateway settings, when a reminder endpoint is configured
    pub fn reminder_gateway(&self) -> Option<ReminderGatewayConfig> {
        let endpoint = self.reminder_endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
        Some(
            ReminderGatewayConfig::new(endpoint, self.reminder_api_key.clone().unwrap_or_default())
                .with_timeout_secs(self.reminder_timeout_secs),
        )
    }
}
