//! Error types for scanner device operations.
//!
//! Every error returned by a device while opening or reading is a fault: the
//! connection manager publishes it through the status register and reconnects
//! after a backoff. A read that simply produced no data is not an error, see
//! [`ReadOutcome::TimedOut`](crate::traits::ReadOutcome::TimedOut).

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during scanner device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not present or has been unplugged.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Access to the device was refused by the operating system.
    #[error("Permission denied: {device}")]
    PermissionDenied { device: String },

    /// Device settings cannot be applied.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Operation is not supported on this platform or device.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Read attempted without an open handle.
    #[error("Device not open: {device}")]
    NotOpen { device: String },

    /// Connection state machine rejected a transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new permission denied error.
    pub fn permission_denied(device: impl Into<String>) -> Self {
        Self::PermissionDenied {
            device: device.into(),
        }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new not-open error.
    pub fn not_open(device: impl Into<String>) -> Self {
        Self::NotOpen {
            device: device.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Classify an I/O error raised while talking to `device`.
    pub fn from_io(device: &str, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
                Self::disconnected(device)
            }
            ErrorKind::PermissionDenied => Self::permission_denied(device),
            ErrorKind::InvalidInput => Self::invalid_argument(error.to_string()),
            ErrorKind::Unsupported => Self::unsupported(error.to_string()),
            _ => Self::Io(error),
        }
    }
}

impl From<tokio::task::JoinError> for HardwareError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Other(format!("device I/O task failed: {error}"))
    }
}
