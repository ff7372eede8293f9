//! Wait and input configuration.
//!
//! Passed explicitly into a [`Session`](crate::Session); nothing here is
//! global. Values come from defaults, a YAML document or `SETTLE_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::result::{SettleError, SettleResult};

/// Default timeout for waits (4 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 4_000;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Environment variable overriding [`Configuration::timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "SETTLE_TIMEOUT_MS";
/// Environment variable overriding [`Configuration::poll_interval_ms`]
pub const ENV_POLL_INTERVAL_MS: &str = "SETTLE_POLL_INTERVAL_MS";
/// Environment variable overriding [`Configuration::fast_set_value`]
pub const ENV_FAST_SET_VALUE: &str = "SETTLE_FAST_SET_VALUE";
/// Environment variable overriding [`Configuration::resource_root`]
pub const ENV_RESOURCE_ROOT: &str = "SETTLE_RESOURCE_ROOT";

/// Timeouts and input strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Default wait timeout in milliseconds
    pub timeout_ms: u64,
    /// Sleep between polling attempts in milliseconds
    pub poll_interval_ms: u64,
    /// Inject values by script instead of simulating keystrokes
    pub fast_set_value: bool,
    /// Directory that resource uploads are resolved against
    pub resource_root: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fast_set_value: false,
            resource_root: PathBuf::from("."),
        }
    }
}

impl Configuration {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Select the script-injection input strategy
    #[must_use]
    pub const fn with_fast_set_value(mut self, enabled: bool) -> Self {
        self.fast_set_value = enabled;
        self
    }

    /// Set the resource root directory
    #[must_use]
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> SettleResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| SettleError::Config {
            message: e.to_string(),
        })
    }

    /// Defaults overridden by `SETTLE_*` environment variables
    pub fn from_env() -> SettleResult<Self> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Override fields from a variable lookup
    pub fn apply_env<F>(mut self, lookup: F) -> SettleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAST_SET_VALUE) {
            self.fast_set_value = parse_flag(ENV_FAST_SET_VALUE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RESOURCE_ROOT) {
            self.resource_root = PathBuf::from(raw);
        }
        Ok(self)
    }
}

fn parse_millis(key: &str, raw: &str) -> SettleResult<u64> {
    raw.trim().parse().map_err(|_| SettleError::Config {
        message: format!("{key} must be a non-negative number of milliseconds, got '{raw}'"),
    })
}

fn parse_flag(key: &str, raw: &str) -> SettleResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettleError::Config {
            message: format!("{key} must be a boolean, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = Configuration::new();
            assert_eq!(config.timeout_ms, 4_000);
            assert_eq!(config.poll_interval_ms, 100);
            assert!(!config.fast_set_value);
            assert_eq!(config.resource_root, PathBuf::from("."));
        }

        #[test]
        fn test_builders_chain() {
            let config = Configuration::new()
                .with_timeout(250)
                .with_poll_interval(10)
                .with_fast_set_value(true)
                .with_resource_root("fixtures");
            assert_eq!(config.timeout(), Duration::from_millis(250));
            assert_eq!(config.poll_interval(), Duration::from_millis(10));
            assert!(config.fast_set_value);
            assert_eq!(config.resource_root, PathBuf::from("fixtures"));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_document_keeps_defaults() {
            let config = Configuration::from_yaml_str("timeout_ms: 1500\n").unwrap();
            assert_eq!(config.timeout_ms, 1500);
            assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_full_document() {
            let yaml = "timeout_ms: 10\npoll_interval_ms: 1\nfast_set_value: true\nresource_root: /tmp/res\n";
            let config = Configuration::from_yaml_str(yaml).unwrap();
            assert_eq!(
                config,
                Configuration::new()
                    .with_timeout(10)
                    .with_poll_interval(1)
                    .with_fast_set_value(true)
                    .with_resource_root("/tmp/res")
            );
        }

        #[test]
        fn test_bad_type_is_config_error() {
            let err = Configuration::from_yaml_str("timeout_ms: soon\n").unwrap_err();
            assert!(matches!(err, SettleError::Config { .. }));
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_env_overrides() {
            let config = Configuration::new()
                .apply_env(vars(&[
                    (ENV_TIMEOUT_MS, "900"),
                    (ENV_POLL_INTERVAL_MS, " 25 "),
                    (ENV_FAST_SET_VALUE, "TRUE"),
                    (ENV_RESOURCE_ROOT, "assets"),
                ]))
                .unwrap();
            assert_eq!(config.timeout_ms, 900);
            assert_eq!(config.poll_interval_ms, 25);
            assert!(config.fast_set_value);
            assert_eq!(config.resource_root, PathBuf::from("assets"));
        }

        #[test]
        fn test_env_absent_keeps_values() {
            let base = Configuration::new().with_timeout(42);
            let config = base.clone().apply_env(vars(&[])).unwrap();
            assert_eq!(config, base);
        }

        #[test]
        fn test_bad_env_values() {
            let err = Configuration::new()
                .apply_env(vars(&[(ENV_TIMEOUT_MS, "-1")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_TIMEOUT_MS));
            let err = Configuration::new()
                .apply_env(vars(&[(ENV_FAST_SET_VALUE, "maybe")]))
                .unwrap_err();
            assert!(matches!(err, SettleError::Config { .. }));
        }
    }
}
