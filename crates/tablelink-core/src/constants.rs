//! Constants shared by the device loop, the dispatch client and the gateway.
//!
//! Defaults mirror the configuration shipped with the table controller so a
//! missing configuration file still produces a working bridge on a standard
//! USB-serial scanner.
//!
//! # Usage
//!
//! ```
//! use tablelink_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(SOURCE_SERIAL, "serial");
//! let poll = Duration::from_millis(DEFAULT_POLL_DELAY_MS);
//! assert_eq!(poll.as_millis(), 200);
//! ```

// ============================================================================
// Scan Sources
// ============================================================================

/// Source tag attached to scans read from the physical device.
pub const SOURCE_SERIAL: &str = "serial";

/// Source tag used for simulated scans when the caller supplies none.
pub const SOURCE_SIMULATED: &str = "simulated";

// ============================================================================
// Status Messages
// ============================================================================

/// Fatal error published when the serial reader is disabled in configuration.
pub const DEVICE_DISABLED_MESSAGE: &str = "Serial port reader disabled by configuration.";

/// Prefix of the fatal error published when the device faults.
pub const DEVICE_UNAVAILABLE_PREFIX: &str = "Serial port unavailable";

/// Validation message returned for an empty simulated payload.
pub const PAYLOAD_REQUIRED_MESSAGE: &str = "Payload is required";

/// Policy message returned when simulated scans are refused while offline.
pub const MOCKING_DISABLED_MESSAGE: &str =
    "Mocking scans is disabled while the scanner is offline.";

// ============================================================================
// Serial Defaults
// ============================================================================

/// Default serial device path.
pub const DEFAULT_PORT_NAME: &str = "/dev/ttyUSB0";

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default number of data bits per character.
pub const DEFAULT_DATA_BITS: u8 = 8;

/// Bounded read timeout for one line, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;

/// Idle wait after an empty read or a read timeout, in milliseconds.
pub const DEFAULT_POLL_DELAY_MS: u64 = 200;

/// Wait after a hardware fault before reopening the device, in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

// ============================================================================
// Backend Defaults
// ============================================================================

/// Default scanner backend endpoint.
pub const DEFAULT_BACKEND_ENDPOINT: &str = "http://localhost:7100";

/// Default table identifier sent with every scan.
pub const DEFAULT_TABLE_ID: &str = "table-1";

/// Number of retries after the first failed attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 5;

/// Base of the exponential backoff, in seconds.
pub const DEFAULT_BASE_RETRY_DELAY_SECS: f64 = 0.5;

/// Per-call deadline for the remote call, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Connection establishment deadline, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Gateway Defaults
// ============================================================================

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TABLELINK_";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tablelink.toml";
