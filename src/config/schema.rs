//! Configuration schema definitions.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes.

use super::error::{ConfigError, ConfigResult};
use crate::port::{DataBits, Parity, PortConfiguration, StopBits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device and line settings
    pub port: PortSection,
    /// Open budget, write timeout and deadline
    pub timeouts: TimeoutsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Build the configuration handed to `GuardedPort::open`.
    pub fn port_configuration(&self) -> ConfigResult<PortConfiguration> {
        let data_bits = DataBits::try_from(self.port.data_bits)
            .map_err(|e| ConfigError::validation("port.data_bits", e.to_string()))?;
        let stop_bits = StopBits::try_from(self.port.stop_bits)
            .map_err(|e| ConfigError::validation("port.stop_bits", e.to_string()))?;
        if self.port.baud_rate == 0 {
            return Err(ConfigError::validation("port.baud_rate", "must be positive"));
        }

        Ok(PortConfiguration::new(self.port.resolve_name(), self.port.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(self.port.parity)
            .timeout(self.port.read_timeout()))
    }

    /// The configuration as a `serio.toml` document.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// `[port]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortSection {
    /// Device name or alias
    pub name: String,
    pub baud_rate: u32,
    /// 5 to 8
    pub data_bits: u8,
    /// 1 or 2
    pub stop_bits: u8,
    pub parity: Parity,
    /// Baseline read timeout in milliseconds, 0 for none
    pub read_timeout_ms: u64,
    /// Friendly names for device paths
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for PortSection {
    fn default() -> Self {
        Self {
            name: default_device().to_string(),
            baud_rate: 115200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            read_timeout_ms: 3000,
            aliases: HashMap::new(),
        }
    }
}

impl PortSection {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// The device path, looked up through `aliases` first.
    pub fn resolve_name(&self) -> String {
        self.aliases
            .get(&self.name)
            .cloned()
            .unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(windows)]
fn default_device() -> &'static str {
    "COM1"
}

#[cfg(not(windows))]
fn default_device() -> &'static str {
    "/dev/ttyUSB0"
}

/// `[timeouts]` section. Zero disables a bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Budget for opening the device
    pub open_ms: u64,
    /// Per-write timeout, used while no deadline is set
    pub write_ms: u64,
    /// Deadline for all I/O, counted from the moment the port is open
    pub deadline_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            open_ms: 10_000,
            write_ms: 2_000,
            deadline_ms: 5_000,
        }
    }
}

impl TimeoutsConfig {
    pub fn open_timeout(&self) -> Option<Duration> {
        (self.open_ms > 0).then(|| Duration::from_millis(self.open_ms))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_ms > 0).then(|| Duration::from_millis(self.deadline_ms))
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error", or a
    /// full `EnvFilter` string. `RUST_LOG` takes precedence.
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}
