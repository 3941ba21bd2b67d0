//! Shared types for the tablelink scanner bridge.
//!
//! Everything that more than one crate needs lives here: the scan data model,
//! the status register published by the device loop, the dispatch seam used by
//! both the device loop and the HTTP gateway, and the configuration model.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod status;
pub mod types;

pub use config::{
    AppConfig, BackendSettings, GatewaySettings, Handshake, LoggingSettings, Parity,
    SerialSettings, StopBits,
};
pub use dispatch::{DispatchError, ScanDispatcher};
pub use error::{Error, Result};
pub use status::{StatusReader, StatusRegister, StatusSnapshot, StatusWriter};
pub use types::{DispatchOutcome, ScanEvent, ScanSource};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
