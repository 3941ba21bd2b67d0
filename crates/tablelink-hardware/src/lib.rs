//! Scanner hardware layer for the tablelink bridge.
//!
//! This crate owns everything that touches the barcode/RFID scanner:
//!
//! - [`traits::ScannerDevice`]: the line-oriented device contract
//! - [`serial::SerialScanner`]: the `serialport` driver
//! - [`mock::MockScanner`]: a scriptable stand-in for tests and demos
//! - [`devices::AnyScannerDevice`]: enum dispatch over the above
//! - [`manager::DeviceConnectionManager`]: the open/read/reconnect loop that
//!   publishes hardware health to the status register
//!
//! # Error Handling
//!
//! Device operations return [`Result<T>`][error::Result] with
//! [`HardwareError`]. The manager never lets these escape: each one becomes a
//! `Faulted` transition and a `"Serial port unavailable: ..."` message in the
//! status register.

pub mod devices;
pub mod error;
pub mod manager;
pub mod mock;
pub mod serial;
pub mod state;
pub mod traits;

pub use devices::AnyScannerDevice;
pub use error::{HardwareError, Result};
pub use manager::{ConnectionSettings, ConnectionSummary, DeviceConnectionManager};
pub use state::{ConnectionState, ConnectionStateMachine, StateTransition};
pub use traits::{ReadOutcome, ScannerDevice};
