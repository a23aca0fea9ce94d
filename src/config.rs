//! Configuration for the brightness layer.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::cache::FRESHNESS_WINDOW;

/// Settings fixed when a [`crate::Hal`] is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Start in simulation mode instead of talking to hardware.
    #[serde(alias = "mockMode")]
    pub simulated: bool,

    /// How long an enumeration is reused, in milliseconds.
    pub cache_ttl_ms: u64,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "brightness_hal=debug,warn").
    pub level: String,

    /// Whether to include the emitting module in each line.
    pub with_target: bool,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            simulated: false,
            cache_ttl_ms: FRESHNESS_WINDOW.as_millis() as u64,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: true,
        }
    }
}

impl HalConfig {
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_hardware_and_half_second_window() {
        let config = HalConfig::default();
        assert!(!config.simulated);
        assert_eq!(config.cache_ttl(), Duration::from_millis(500));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: HalConfig = serde_json::from_str(r#"{"mockMode": true}"#).unwrap();
        assert!(config.simulated);
        assert_eq!(config.cache_ttl_ms, 500);

        let config: HalConfig =
            serde_json::from_str(r#"{"cache_ttl_ms": 50, "logging": {"level": "debug"}}"#)
                .unwrap();
        assert!(!config.simulated);
        assert_eq!(config.cache_ttl(), Duration::from_millis(50));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.with_target);
    }
}
