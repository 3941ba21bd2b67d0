//! Scanner device trait definition.
//!
//! This module defines the contract between the connection manager and a
//! line-oriented scanner. Implementations own the physical handle; the
//! manager drives them strictly sequentially from a single task.
//!
//! Methods return `impl Future + Send` so the manager future stays `Send`
//! when spawned on the Tokio runtime, while implementations can still be
//! written with plain `async fn`.

use crate::error::Result;
use std::future::Future;

/// Result of one bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, terminator included. May be blank.
    Line(String),

    /// No complete line arrived within the read timeout.
    TimedOut,
}

/// Line-oriented scanner device.
///
/// # Examples
///
/// ```
/// use tablelink_hardware::traits::{ReadOutcome, ScannerDevice};
/// use tablelink_hardware::Result;
///
/// async fn next_payload<D: ScannerDevice>(device: &mut D) -> Result<Option<String>> {
///     if !device.is_open() {
///         device.open().await?;
///     }
///
///     match device.read_line().await? {
///         ReadOutcome::Line(line) if !line.trim().is_empty() => Ok(Some(line.trim().to_string())),
///         _ => Ok(None),
///     }
/// }
/// ```
pub trait ScannerDevice: Send {
    /// Acquire the physical handle. Opening an open device is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened; the caller treats
    /// every error as a fault.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Read one line, waiting at most the configured read timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not open or the read failed.
    fn read_line(&mut self) -> impl Future<Output = Result<ReadOutcome>> + Send;

    /// Release the physical handle. Closing a closed device is a no-op.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Whether a handle is currently held.
    fn is_open(&self) -> bool;

    /// Human-readable device name used in logs and status messages.
    fn name(&self) -> &str;
}
