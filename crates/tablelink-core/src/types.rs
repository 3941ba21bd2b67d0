use crate::{
    Result,
    constants::{SOURCE_SERIAL, SOURCE_SIMULATED},
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a scan.
///
/// Scans read from the device are always `Serial`; simulated scans default to
/// `Simulated` but callers may tag them with their own source name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ScanSource {
    /// Read from the physical scanner.
    Serial,
    /// Injected through the simulate endpoint without a caller tag.
    Simulated,
    /// Caller-supplied tag, trimmed and non-empty.
    Custom(String),
}

impl ScanSource {
    /// Normalize an optional caller-supplied source.
    ///
    /// Missing or whitespace-only input falls back to `Simulated`; anything
    /// else is trimmed. The reserved names map to their variants.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Simulated,
            Some(tag) => Self::from(tag.to_string()),
        }
    }

    /// Wire name of the source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Serial => SOURCE_SERIAL,
            Self::Simulated => SOURCE_SIMULATED,
            Self::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ScanSource {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            SOURCE_SERIAL => Self::Serial,
            SOURCE_SIMULATED => Self::Simulated,
            _ => Self::Custom(tag),
        }
    }
}

impl From<ScanSource> for String {
    fn from(source: ScanSource) -> Self {
        match source {
            ScanSource::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

/// A single scan ready to be forwarded to the backend.
///
/// The payload is always trimmed and non-empty. Events are immutable and are
/// consumed by exactly one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    payload: String,
    source: ScanSource,
    captured_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Create an event from a raw payload, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns `Error::EmptyPayload` if nothing is left after trimming.
    pub fn new(raw_payload: &str, source: ScanSource) -> Result<Self> {
        let payload = raw_payload.trim();
        if payload.is_empty() {
            return Err(Error::EmptyPayload);
        }

        Ok(Self {
            payload: payload.to_string(),
            source,
            captured_at: Utc::now(),
        })
    }

    /// Create an event for a line read from the serial device.
    ///
    /// Returns `None` for blank lines, which the device loop treats as idle.
    pub fn from_serial_line(line: &str) -> Option<Self> {
        Self::new(line, ScanSource::Serial).ok()
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn source(&self) -> &ScanSource {
        &self.source
    }

    /// Moment the line was read or the simulated request was validated.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// Backend verdict for a dispatched scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Whether the backend accepted the scan.
    pub accepted: bool,

    /// Human-readable message from the backend.
    pub message: String,
}

impl DispatchOutcome {
    pub fn new(accepted: bool, message: impl Into<String>) -> Self {
        Self {
            accepted,
            message: message.into(),
        }
    }
}
