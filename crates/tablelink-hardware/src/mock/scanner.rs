//! Mock scanner implementation for testing and development.
//!
//! The mock behaves like a serial scanner: reads wait at most the read
//! timeout, lines carry their terminator, and faults can be injected at any
//! point to exercise the reconnect path without hardware.

use crate::{
    HardwareError, Result,
    traits::{ReadOutcome, ScannerDevice},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Read timeout used when none is given.
const DEFAULT_MOCK_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Mock line scanner.
///
/// # Examples
///
/// ```
/// use tablelink_hardware::mock::MockScanner;
/// use tablelink_hardware::traits::{ReadOutcome, ScannerDevice};
///
/// #[tokio::main]
/// async fn main() -> tablelink_hardware::Result<()> {
///     let (mut scanner, handle) = MockScanner::new();
///     scanner.open().await?;
///
///     handle.send_line("  XYZ123\n").await?;
///     assert_eq!(scanner.read_line().await?, ReadOutcome::Line("  XYZ123\n".into()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockScanner {
    event_rx: mpsc::Receiver<ScannerEvent>,
    name: String,
    read_timeout: Duration,
    open: bool,
    shared: Arc<Shared>,
}

/// State visible to both the scanner and its handles.
#[derive(Debug, Default)]
struct Shared {
    open_failures: Mutex<VecDeque<HardwareError>>,
    open_attempts: AtomicUsize,
    close_count: AtomicUsize,
}

#[derive(Debug)]
enum ScannerEvent {
    Line(String),
    Fault(HardwareError),
}

impl MockScanner {
    /// Create a new mock scanner with the default name.
    pub fn new() -> (Self, MockScannerHandle) {
        Self::with_name("Mock Scanner")
    }

    /// Create a new mock scanner with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockScannerHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let name = name.into();
        let shared = Arc::new(Shared::default());

        let scanner = Self {
            event_rx,
            name: name.clone(),
            read_timeout: DEFAULT_MOCK_READ_TIMEOUT,
            open: false,
            shared: Arc::clone(&shared),
        };

        let handle = MockScannerHandle {
            event_tx,
            name,
            shared,
        };

        (scanner, handle)
    }

    /// Set how long a read waits before reporting [`ReadOutcome::TimedOut`].
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl ScannerDevice for MockScanner {
    async fn open(&mut self) -> Result<()> {
        self.shared.open_attempts.fetch_add(1, Ordering::SeqCst);

        let failure = self
            .shared
            .open_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match failure {
            Some(error) => Err(error),
            None => {
                self.open = true;
                Ok(())
            }
        }
    }

    async fn read_line(&mut self) -> Result<ReadOutcome> {
        if !self.open {
            return Err(HardwareError::not_open(&self.name));
        }

        match tokio::time::timeout(self.read_timeout, self.event_rx.recv()).await {
            Err(_elapsed) => Ok(ReadOutcome::TimedOut),
            Ok(Some(ScannerEvent::Line(line))) => Ok(ReadOutcome::Line(line)),
            Ok(Some(ScannerEvent::Fault(error))) => {
                self.open = false;
                Err(error)
            }
            Ok(None) => {
                self.open = false;
                Err(HardwareError::disconnected(&self.name))
            }
        }
    }

    async fn close(&mut self) {
        self.open = false;
        self.shared.close_count.fetch_add(1, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for driving a [`MockScanner`].
///
/// Clones share the same scanner: lines and faults sent through any clone
/// are read in order.
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    event_tx: mpsc::Sender<ScannerEvent>,
    name: String,
    shared: Arc<Shared>,
}

impl MockScannerHandle {
    /// Queue a raw line. Include the terminator to mimic a real scanner.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the scanner has been dropped.
    pub async fn send_line(&self, line: impl Into<String>) -> Result<()> {
        self.send(ScannerEvent::Line(line.into())).await
    }

    /// Make the next read fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the scanner has been dropped.
    pub async fn inject_fault(&self, error: HardwareError) -> Result<()> {
        self.send(ScannerEvent::Fault(error)).await
    }

    /// Make the next call to `open` fail with `error`. Calls stack.
    pub fn fail_next_open(&self, error: HardwareError) {
        self.shared
            .open_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Number of times `open` has been called.
    pub fn open_attempts(&self) -> usize {
        self.shared.open_attempts.load(Ordering::SeqCst)
    }

    /// Number of times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.shared.close_count.load(Ordering::SeqCst)
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: ScannerEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected(&self.name))
    }
}
