//! Configuration model and loading.
//!
//! Configuration is layered with Figment:
//! 1. built-in defaults
//! 2. an optional TOML file (missing files are ignored)
//! 3. environment variables prefixed with `TABLELINK_`, using `__` between
//!    section and key
//!
//! ```text
//! TABLELINK_SERIAL__PORT_NAME=/dev/ttyACM0
//! TABLELINK_BACKEND__RETRY_COUNT=3
//! TABLELINK_SERIAL__ALLOW_MOCK_WHEN_UNAVAILABLE=false
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tablelink_core::AppConfig;
//!
//! let config = AppConfig::load_from("tablelink.toml")?;
//! println!("Reading from {}", config.serial.port_name);
//! # Ok::<(), tablelink_core::Error>(())
//! ```

use crate::constants::*;
use crate::{Error, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialSettings,
    pub backend: BackendSettings,
    pub gateway: GatewaySettings,
    pub logging: LoggingSettings,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handshake {
    #[default]
    None,
    XonXoff,
    RequestToSend,
    RequestToSendXonXoff,
}

/// Serial scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// When false the device loop publishes a fixed error and does nothing.
    pub enabled: bool,
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub handshake: Handshake,
    pub read_timeout_ms: u64,
    pub poll_delay_ms: u64,
    pub reconnect_delay_secs: u64,
    /// Accept simulated scans while the hardware is unavailable.
    pub allow_mock_when_unavailable: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port_name: DEFAULT_PORT_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DEFAULT_DATA_BITS,
            parity: Parity::None,
            stop_bits: StopBits::One,
            handshake: Handshake::None,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
            allow_mock_when_unavailable: true,
        }
    }
}

impl SerialSettings {
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Scanner backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: String,
    pub table_id: String,
    /// Retries after the first failed attempt.
    pub retry_count: u32,
    pub base_retry_delay_secs: f64,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_BACKEND_ENDPOINT.to_string(),
            table_id: DEFAULT_TABLE_ID.to_string(),
            retry_count: DEFAULT_RETRY_COUNT,
            base_retry_delay_secs: DEFAULT_BASE_RETRY_DELAY_SECS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl BackendSettings {
    /// Saturates at `Duration::MAX` and clamps negative or NaN values to
    /// zero; `validate` rejects both.
    #[must_use]
    pub fn base_retry_delay(&self) -> Duration {
        let secs = self.base_retry_delay_secs;
        Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub bind_addr: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Logging settings. `RUST_LOG` takes precedence over `filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Build the layered provider without extracting it.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from the default file name in the working directory.
    ///
    /// # Errors
    /// Returns an error if a source is malformed or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration using `path` as the TOML layer.
    ///
    /// # Errors
    /// Returns an error if a source is malformed or validation fails.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let serial = &self.serial;
        if serial.port_name.trim().is_empty() {
            return Err(Error::Config("serial.port_name must not be empty".into()));
        }
        if serial.baud_rate == 0 {
            return Err(Error::Config("serial.baud_rate must be positive".into()));
        }
        if !(5..=8).contains(&serial.data_bits) {
            return Err(Error::Config(format!(
                "serial.data_bits must be 5-8, got {}",
                serial.data_bits
            )));
        }
        if serial.read_timeout_ms == 0 {
            return Err(Error::Config(
                "serial.read_timeout_ms must be positive".into(),
            ));
        }

        let backend = &self.backend;
        if backend.table_id.trim().is_empty() {
            return Err(Error::Config("backend.table_id must not be empty".into()));
        }
        if !(backend.endpoint.starts_with("http://") || backend.endpoint.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "backend.endpoint must be an http(s) URL, got '{}'",
                backend.endpoint
            )));
        }
        if Duration::try_from_secs_f64(backend.base_retry_delay_secs).is_err() {
            return Err(Error::Config(format!(
                "backend.base_retry_delay_secs must be a non-negative number of seconds \
                 that fits a duration, got {}",
                backend.base_retry_delay_secs
            )));
        }

        Ok(())
    }
}
