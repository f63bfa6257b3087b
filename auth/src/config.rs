//! Coordinator configuration.
//!
//! Values are provided by the application, either built in code with the
//! `with_*` setters or read from `AUTHFLOW_*` environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`AuthConfig::provider_timeout_ms`].
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "AUTHFLOW_PROVIDER_TIMEOUT_MS";
/// Environment variable overriding [`AuthConfig::response_timeout_ms`].
pub const ENV_RESPONSE_TIMEOUT_MS: &str = "AUTHFLOW_RESPONSE_TIMEOUT_MS";
/// Environment variable overriding [`AuthConfig::broadcast_capacity`].
pub const ENV_BROADCAST_CAPACITY: &str = "AUTHFLOW_BROADCAST_CAPACITY";
/// Environment variable overriding [`AuthConfig::shutdown_timeout_ms`].
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "AUTHFLOW_SHUTDOWN_TIMEOUT_MS";

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Setting or environment variable name
        key: String,
        /// Offending raw value
        value: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Authentication coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Upper bound for a single identity-provider call, in milliseconds.
    ///
    /// Default: 30 000
    pub provider_timeout_ms: u64,

    /// How long `*_and_wait` callers wait for their outcome, in milliseconds.
    ///
    /// An intent may wait out the startup session check before its own
    /// provider work starts, so this must exceed twice
    /// [`provider_timeout_ms`](Self::provider_timeout_ms).
    ///
    /// Default: 90 000
    pub response_timeout_ms: u64,

    /// Capacity of the action broadcast channel behind the observable streams.
    ///
    /// Default: 64
    pub broadcast_capacity: usize,

    /// Default grace period for draining in-flight work on shutdown, in milliseconds.
    ///
    /// Default: 5 000
    pub shutdown_timeout_ms: u64,
}

impl AuthConfig {
    /// Load configuration from the process environment
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is not a number, or
    /// [`ConfigError::Validation`] if the result fails [`AuthConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Same as [`AuthConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, ENV_PROVIDER_TIMEOUT_MS)? {
            config.provider_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, ENV_RESPONSE_TIMEOUT_MS)? {
            config.response_timeout_ms = ms;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_BROADCAST_CAPACITY)? {
            config.broadcast_capacity = capacity;
        }
        if let Some(ms) = parse_var(&lookup, ENV_SHUTDOWN_TIMEOUT_MS)? {
            config.shutdown_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if a timeout or the capacity is zero, or if callers would
    /// stop waiting before the provider call they wait on can time out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "provider_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "response_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation(
                "broadcast_capacity must be > 0".to_string(),
            ));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "shutdown_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.response_timeout_ms <= self.provider_timeout_ms.saturating_mul(2) {
            return Err(ConfigError::Validation(
                "response_timeout_ms must be > 2 * provider_timeout_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Get provider timeout as Duration
    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Get response timeout as Duration
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Get shutdown timeout as Duration
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Set the provider call timeout.
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = millis(timeout);
        self
    }

    /// Set the per-call response timeout.
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout_ms = millis(timeout);
        self
    }

    /// Set the broadcast channel capacity.
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = millis(timeout);
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 30_000,
            response_timeout_ms: 90_000,
            broadcast_capacity: 64,
            shutdown_timeout_ms: 5_000,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AuthConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider_timeout(), Duration::from_secs(30));
        assert_eq!(config.response_timeout(), Duration::from_secs(90));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.broadcast_capacity, 64);
    }

    #[test]
    fn test_builders() {
        let config = AuthConfig::default()
            .with_provider_timeout(Duration::from_millis(250))
            .with_response_timeout(Duration::from_secs(1))
            .with_broadcast_capacity(8)
            .with_shutdown_timeout(Duration::from_millis(100));

        assert_eq!(config.provider_timeout_ms, 250);
        assert_eq!(config.response_timeout_ms, 1_000);
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.shutdown_timeout_ms, 100);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let zero_timeout = AuthConfig::default().with_provider_timeout(Duration::ZERO);
        assert!(matches!(zero_timeout.validate(), Err(ConfigError::Validation(_))));

        let zero_capacity = AuthConfig::default().with_broadcast_capacity(0);
        assert!(matches!(zero_capacity.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_response_shorter_than_provider() {
        let config = AuthConfig::default()
            .with_provider_timeout(Duration::from_secs(10))
            .with_response_timeout(Duration::from_secs(5));

        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_response_timeout_must_cover_session_check_and_call() {
        let at_bound = AuthConfig::default()
            .with_provider_timeout(Duration::from_millis(100))
            .with_response_timeout(Duration::from_millis(200));
        assert!(matches!(at_bound.validate(), Err(ConfigError::Validation(_))));

        let above = at_bound.with_response_timeout(Duration::from_millis(201));
        assert_eq!(above.validate(), Ok(()));
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let config = AuthConfig::from_lookup(lookup(&[
            (ENV_PROVIDER_TIMEOUT_MS, "1500"),
            (ENV_BROADCAST_CAPACITY, " 128 "),
        ]))
        .unwrap_or_else(|e| panic!("config should load: {e}"));

        assert_eq!(config.provider_timeout(), Duration::from_millis(1_500));
        assert_eq!(config.broadcast_capacity, 128);
        assert_eq!(config.response_timeout_ms, 90_000);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = AuthConfig::from_lookup(lookup(&[(ENV_SHUTDOWN_TIMEOUT_MS, "soon")]));

        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                key: ENV_SHUTDOWN_TIMEOUT_MS.to_string(),
                value: "soon".to_string(),
            })
        );
    }

    #[test]
    fn test_from_lookup_validates_result() {
        let result = AuthConfig::from_lookup(lookup(&[(ENV_RESPONSE_TIMEOUT_MS, "10")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
