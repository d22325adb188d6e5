//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! The monitor takes no command-line flags. At startup it looks for
//! `gauge-monitor.toml` in the working directory (or the file named by the
//! `GAUGE_MONITOR_CONFIG` environment variable) and falls back to built-in
//! defaults when no file exists. Every field has a default, so a file only needs
//! the values that differ from this deployment.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GaugeMonitorError, Result};
use crate::gauge::reader::ReadRetryPolicy;
use crate::store::Retention;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gauge-monitor.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_FILE`]
pub const CONFIG_ENV_VAR: &str = "GAUGE_MONITOR_CONFIG";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Remote shell (SSH) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Extra arguments passed verbatim to `ssh` before the host
    #[serde(default)]
    pub ssh_options: Vec<String>,

    /// OpenSSH `ControlPath` used to multiplex every read over one connection
    #[serde(default = "default_control_path")]
    pub control_path: String,
}

/// Fuel-gauge bus and scaling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    #[serde(default = "default_device_address")]
    pub device_address: u8,

    #[serde(default = "default_sense_resistor_milliohm")]
    pub sense_resistor_milliohm: f64,
}

/// Polling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub max_read_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Persisted time series configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Newest samples kept in memory and on disk (0 = unbounded)
    #[serde(default)]
    pub max_samples: usize,
}

/// Live chart configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_render_enabled")]
    pub enabled: bool,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,
}

// Default value functions
fn default_host() -> String { "zs2149027".to_string() }
fn default_control_path() -> String { "/tmp/gauge-monitor-%C".to_string() }

fn default_i2c_bus() -> u8 { 0 }
fn default_device_address() -> u8 { 0x36 }
fn default_sense_resistor_milliohm() -> f64 { 10.0 }

fn default_interval_ms() -> u64 { 100 }
fn default_retry_delay_ms() -> u64 { 50 }

fn default_store_path() -> PathBuf { PathBuf::from("db.json") }

fn default_render_enabled() -> bool { true }
fn default_output_path() -> PathBuf { PathBuf::from("gauge-monitor.png") }
fn default_refresh_ms() -> u64 { 125 }
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 800 }

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ssh_options: Vec::new(),
            control_path: default_control_path(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            device_address: default_device_address(),
            sense_resistor_milliohm: default_sense_resistor_milliohm(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_read_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_samples: 0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: default_render_enabled(),
            output_path: default_output_path(),
            refresh_ms: default_refresh_ms(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl SamplingConfig {
    /// Pause between two polling cycles
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Retry policy applied to every register read
    pub fn retry_policy(&self) -> ReadRetryPolicy {
        ReadRetryPolicy {
            max_retries: self.max_read_retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl StoreConfig {
    /// Retention policy derived from `max_samples`
    pub fn retention(&self) -> Retention {
        match self.max_samples {
            0 => Retention::Unbounded,
            n => Retention::MaxSamples(n),
        }
    }
}

impl RenderConfig {
    /// Pause between two chart redraws
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gauge_monitor::config::Config;
    ///
    /// let config = Config::load("gauge-monitor.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration file if one exists, otherwise use the defaults
    ///
    /// The file named by `GAUGE_MONITOR_CONFIG` must exist when the variable is
    /// set; the implicit `gauge-monitor.toml` is optional.
    pub fn load_or_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(path);
        }

        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.remote.host.trim().is_empty() {
            return Err(invalid("remote host cannot be empty"));
        }

        if self.remote.control_path.is_empty() {
            return Err(invalid("remote control_path cannot be empty"));
        }

        // 7-bit I2C addressing
        if self.device.device_address > 0x7F {
            return Err(invalid("device_address must be between 0x00 and 0x7F"));
        }

        if !(self.device.sense_resistor_milliohm > 0.0) {
            return Err(invalid("sense_resistor_milliohm must be greater than 0"));
        }

        if self.sampling.interval_ms == 0 || self.sampling.interval_ms > 60000 {
            return Err(invalid("interval_ms must be between 1 and 60000"));
        }

        if self.sampling.max_read_retries > 0 && self.sampling.retry_delay_ms > 60000 {
            return Err(invalid("retry_delay_ms must be at most 60000"));
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(invalid("store path cannot be empty"));
        }

        if self.render.enabled {
            if self.render.output_path.as_os_str().is_empty() {
                return Err(invalid("render output_path cannot be empty when enabled"));
            }

            if self.render.refresh_ms == 0 || self.render.refresh_ms > 60000 {
                return Err(invalid("refresh_ms must be between 1 and 60000"));
            }

            if self.render.width == 0 || self.render.height == 0 {
                return Err(invalid("render width and height must be greater than 0"));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> GaugeMonitorError {
    GaugeMonitorError::Config(toml::de::Error::custom(message))
}
