//! Mock device implementations for testing and development.
//!
//! The mock scanner can be driven programmatically, so the connection manager
//! and the ingress gateway can be exercised without a serial port.

pub mod scanner;

pub use scanner::{MockScanner, MockScannerHandle};
