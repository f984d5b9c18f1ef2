//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `monitor.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - UpstreamConfig: where /api/data and /api/hp-latest live.
//!     - PollingConfig: period of the device loop and the phone loop.
//!     - HistoryConfig: samples kept per metric stream.
//!     - ThresholdsConfig: temperature warning / low battery limits.
//!     - ServerConfig: the read-only JSON API for renderers.
//!     - LoggingConfig: log level and per-device reading output.
//!
//! ==============================================================================

use crate::store::Thresholds;
use crate::window::HISTORY_CAPACITY;

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub upstream: UpstreamConfig,
    pub polling: PollingConfig,
    pub history: HistoryConfig,
    pub thresholds: ThresholdsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub devices_path: String,
    pub phone_path: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub devices_interval_ms: u64,
    pub phone_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub temperature_warning_c: f64,
    pub battery_low_percent: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_device_data: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            devices_path: "/api/data".to_string(),
            phone_path: "/api/hp-latest".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            devices_interval_ms: 2000,
            phone_interval_ms: 5000,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: HISTORY_CAPACITY,
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let t = Thresholds::default();
        Self {
            temperature_warning_c: t.temperature_warning_c,
            battery_low_percent: t.battery_low_percent,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_device_data: true,
        }
    }
}

impl UpstreamConfig {
    pub fn devices_url(&self) -> String {
        join_url(&self.base_url, &self.devices_path)
    }

    pub fn phone_url(&self) -> String {
        join_url(&self.base_url, &self.phone_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

impl PollingConfig {
    pub fn devices_interval(&self) -> Duration {
        Duration::from_millis(self.devices_interval_ms)
    }

    pub fn phone_interval(&self) -> Duration {
        Duration::from_millis(self.phone_interval_ms)
    }
}

impl From<&ThresholdsConfig> for Thresholds {
    fn from(cfg: &ThresholdsConfig) -> Self {
        Thresholds {
            temperature_warning_c: cfg.temperature_warning_c,
            battery_low_percent: cfg.battery_low_percent,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: MonitorConfig = toml::from_str(content).context("Failed to parse config")?;
        Ok(config.validated())
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("monitor.toml"),
            PathBuf::from("..").join("config").join("monitor.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// replace values that would stall or empty the pipeline
    fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.polling.devices_interval_ms == 0 {
            tracing::warn!("[CONFIG] polling.devices_interval_ms must be > 0, using default");
            self.polling.devices_interval_ms = defaults.polling.devices_interval_ms;
        }
        if self.polling.phone_interval_ms == 0 {
            tracing::warn!("[CONFIG] polling.phone_interval_ms must be > 0, using default");
            self.polling.phone_interval_ms = defaults.polling.phone_interval_ms;
        }
        if self.history.capacity == 0 {
            tracing::warn!("[CONFIG] history.capacity must be > 0, using default");
            self.history.capacity = defaults.history.capacity;
        }
        self
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!("┌─────────────────────────────────────────┐");
        tracing::info!("│         MONITOR CONFIGURATION           │");
        tracing::info!("├─────────────────────────────────────────┤");
        tracing::info!("│ Upstream: {}", self.upstream.base_url);
        tracing::info!("│ Device poll: {}ms", self.polling.devices_interval_ms);
        tracing::info!("│ Phone poll: {}ms", self.polling.phone_interval_ms);
        tracing::info!("│ History capacity: {}", self.history.capacity);
        let api = if self.server.enabled {
            self.server.bind.as_str()
        } else {
            "disabled"
        };
        tracing::info!("│ API: {}", api);
        tracing::info!("│ Log Level: {}", self.logging.level);
        tracing::info!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = MonitorConfig::parse("").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.polling.devices_interval(), Duration::from_secs(2));
        assert_eq!(config.polling.phone_interval(), Duration::from_secs(5));
        assert_eq!(config.history.capacity, 100);

        let upstream = &config.upstream;
        assert_eq!(upstream.devices_url(), "http://127.0.0.1:5000/api/data");
        assert_eq!(upstream.phone_url(), "http://127.0.0.1:5000/api/hp-latest");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = MonitorConfig::parse(
            r#"
            [upstream]
            base_url = "http://monitor.lan:5000/"

            [thresholds]
            temperature_warning_c = 75.0

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let devices_url = config.upstream.devices_url();
        assert_eq!(devices_url, "http://monitor.lan:5000/api/data");
        let thresholds = Thresholds::from(&config.thresholds);
        assert_eq!(thresholds.temperature_warning_c, 75.0);
        assert_eq!(thresholds.battery_low_percent, 20.0);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.show_device_data);
        assert!(config.server.enabled);
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let config = MonitorConfig::parse(
            r#"
            [polling]
            devices_interval_ms = 0
            phone_interval_ms = 250

            [history]
            capacity = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.polling.devices_interval_ms, 2000);
        assert_eq!(config.polling.phone_interval_ms, 250);
        assert_eq!(config.history.capacity, 100);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let wrong_type = "[polling]\ndevices_interval_ms = \"fast\"";
        assert!(MonitorConfig::parse(wrong_type).is_err());
        assert!(MonitorConfig::load("does/not/exist.toml").is_err());
    }
}
