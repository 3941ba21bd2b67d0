//! Enum wrapper for scanner device dispatch.
//!
//! `ScannerDevice` uses `impl Future` returns and is not object-safe, so the
//! binary picks a concrete device through [`AnyScannerDevice`] instead of a
//! `Box<dyn ScannerDevice>`.
//!
//! # Examples
//!
//! ```
//! use tablelink_hardware::devices::AnyScannerDevice;
//! use tablelink_hardware::mock::MockScanner;
//! use tablelink_hardware::traits::ScannerDevice;
//!
//! let (scanner, _handle) = MockScanner::with_name("bench scanner");
//! let device = AnyScannerDevice::Mock(scanner);
//! assert_eq!(device.name(), "bench scanner");
//! ```

use crate::Result;
use crate::mock::MockScanner;
use crate::serial::SerialScanner;
use crate::traits::{ReadOutcome, ScannerDevice};

/// Any supported scanner.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScannerDevice {
    /// Scanner on a serial port.
    Serial(SerialScanner),

    /// Scripted scanner for development and testing.
    Mock(MockScanner),
}

impl ScannerDevice for AnyScannerDevice {
    async fn open(&mut self) -> Result<()> {
        match self {
            Self::Serial(device) => device.open().await,
            Self::Mock(device) => device.open().await,
        }
    }

    async fn read_line(&mut self) -> Result<ReadOutcome> {
        match self {
            Self::Serial(device) => device.read_line().await,
            Self::Mock(device) => device.read_line().await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Serial(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Serial(device) => device.is_open(),
            Self::Mock(device) => device.is_open(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Serial(device) => device.name(),
            Self::Mock(device) => device.name(),
        }
    }
}

impl From<SerialScanner> for AnyScannerDevice {
    fn from(device: SerialScanner) -> Self {
        Self::Serial(device)
    }
}

impl From<MockScanner> for AnyScannerDevice {
    fn from(device: MockScanner) -> Self {
        Self::Mock(device)
    }
}
