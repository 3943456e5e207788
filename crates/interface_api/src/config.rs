//! API configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use domain_collections::ProcessorConfig;
use domain_messaging::ChannelSettings;

/// API configuration
///
/// Loaded from built-in defaults overlaid with `API_*` environment
/// variables. Nested values use `__`, e.g.
/// `API_PROVIDERS__TWILIO__ACCOUNT_SID`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
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
    /// Log level
    pub log_level: String,
    /// Bearer secret for the reminder run trigger; empty disables it
    pub cron_secret: String,
    /// Reminders fetched per run
    pub batch_limit: u32,
    /// Reminders processed concurrently within a run
    pub max_concurrency: usize,
    /// Timeout for calls to AI, messaging and payment providers
    pub provider_timeout_secs: u64,
    /// System-wide provider settings that user settings are laid over
    pub providers: ChannelSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/receivables".to_string(),
            log_level: "info".to_string(),
            cron_secret: String::new(),
            batch_limit: 100,
            max_concurrency: 4,
            provider_timeout_secs: 30,
            providers: ChannelSettings::default(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"***")
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("log_level", &self.log_level)
            .field("cron_secret", &(!self.cron_secret.is_empty()).then_some("***"))
            .field("batch_limit", &self.batch_limit)
            .field("max_concurrency", &self.max_concurrency)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("providers", &self.providers)
            .finish()
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&ApiConfig::default())?)
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            batch_limit: self.batch_limit,
            max_concurrency: self.max_concurrency,
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.batch_limit, 100);
        assert!(config.cron_secret.is_empty());
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.processor_config().max_concurrency, 4);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ApiConfig {
            jwt_secret: "jwt-very-secret".into(),
            cron_secret: "cron-very-secret".into(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
    }
}
