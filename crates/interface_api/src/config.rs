//! API configuration

use serde::Deserialize;
use workflow_billing_period::{DEFAULT_BILLING_PERIOD_DAYS, MAX_BILLING_PERIOD_DAYS};

/// API configuration
///
/// Every field has a default, so an empty environment yields a working
/// local setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// Length of each bill's billing period, in days (1..=365)
    pub billing_period_days: u32,
    /// Bill events buffered per subscriber before the slowest one lags
    pub event_buffer: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            billing_period_days: DEFAULT_BILLING_PERIOD_DAYS,
            event_buffer: 256,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_config(
            config::Config::builder()
                .add_source(config::Environment::with_prefix("API"))
                .build()?,
        )
    }

    /// Deserializes and validates an already-built configuration
    pub fn from_config(source: config::Config) -> Result<Self, config::ConfigError> {
        let config: Self = source.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_BILLING_PERIOD_DAYS).contains(&self.billing_period_days) {
            return Err(config::ConfigError::Message(format!(
                "billing_period_days must be between 1 and {}, got {}",
                MAX_BILLING_PERIOD_DAYS, self.billing_period_days
            )));
        }
        if self.event_buffer == 0 {
            return Err(config::ConfigError::Message(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
