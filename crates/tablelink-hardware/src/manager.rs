//! Scanner connection manager.
//!
//! The manager owns the scanner end to end: it opens the device, reads lines,
//! forwards non-blank lines to the backend, and reconnects after faults. The
//! only thing the rest of the process sees is the status register it
//! publishes to.
//!
//! ```text
//!            ┌──────────── reconnect delay ────────────┐
//!            ▼                                         │
//! Closed ─► Opening ─► Open ─── read error ──────► Faulted
//!   │          │        │ ▲                            ▲
//!   │          │        └─┘ line / timeout             │
//!   │          └──────────── open error ───────────────┤
//!   └──────────────────────── disabled ────────────────┘
//! ```
//!
//! A single task drives the loop, so there is never more than one open
//! handle and never two reads in flight. Dispatch failures are logged and
//! counted; they never change the connection state.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablelink_core::{DispatchError, DispatchOutcome, ScanDispatcher, SerialSettings, StatusRegister};
//! use tablelink_hardware::devices::AnyScannerDevice;
//! use tablelink_hardware::manager::{ConnectionSettings, DeviceConnectionManager};
//! use tablelink_hardware::serial::SerialScanner;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Discard;
//!
//! impl ScanDispatcher for Discard {
//!     async fn dispatch(
//!         &self,
//!         _payload: &str,
//!         _source: &str,
//!         _cancel: &CancellationToken,
//!     ) -> Result<DispatchOutcome, DispatchError> {
//!         Ok(DispatchOutcome::new(true, "discarded"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = SerialSettings::default();
//!     let (writer, reader) = StatusRegister::new();
//!     let device = AnyScannerDevice::Serial(SerialScanner::new(settings.clone()));
//!
//!     let shutdown = CancellationToken::new();
//!     let task = DeviceConnectionManager::new(
//!         device,
//!         Arc::new(Discard),
//!         writer,
//!         ConnectionSettings::from(&settings),
//!     )
//!     .spawn(shutdown.clone());
//!
//!     println!("available: {}", reader.hardware_available());
//!     shutdown.cancel();
//!     let summary = task.await.unwrap();
//!     println!("open attempts: {}", summary.open_attempts);
//! }
//! ```

use crate::error::HardwareError;
use crate::state::{ConnectionState, ConnectionStateMachine, StateTransition};
use crate::traits::{ReadOutcome, ScannerDevice};
use serde::Serialize;
use std::time::Duration;
use tablelink_core::constants::{DEVICE_DISABLED_MESSAGE, DEVICE_UNAVAILABLE_PREFIX};
use tablelink_core::{ScanDispatcher, ScanEvent, SerialSettings, StatusWriter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Loop timing and the enabled flag, taken from [`SerialSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// When false the manager publishes a fixed error and exits.
    pub enabled: bool,

    /// Wait after a blank line or a read timeout.
    pub poll_delay: Duration,

    /// Wait after a fault before reopening.
    pub reconnect_delay: Duration,
}

impl From<&SerialSettings> for ConnectionSettings {
    fn from(settings: &SerialSettings) -> Self {
        Self {
            enabled: settings.enabled,
            poll_delay: settings.poll_delay(),
            reconnect_delay: settings.reconnect_delay(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&SerialSettings::default())
    }
}

/// What the manager did before it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    /// State when the loop exited.
    pub final_state: ConnectionState,

    /// Total transitions, including those no longer in `transitions`.
    pub transition_count: u64,

    /// Most recent transitions, oldest first.
    pub transitions: Vec<StateTransition>,

    /// Calls to `open`, successful or not.
    pub open_attempts: u64,

    /// Lines the backend answered.
    pub scans_dispatched: u64,

    /// Lines whose dispatch failed.
    pub dispatch_failures: u64,
}

/// How a read session ended.
enum SessionEnd {
    Fault(HardwareError),
    Shutdown,
}

/// Drives one scanner and forwards its lines through a dispatcher.
pub struct DeviceConnectionManager<D, P> {
    device: D,
    dispatcher: P,
    status: StatusWriter,
    settings: ConnectionSettings,
    machine: ConnectionStateMachine,
    open_attempts: u64,
    scans_dispatched: u64,
    dispatch_failures: u64,
}

impl<D, P> DeviceConnectionManager<D, P>
where
    D: ScannerDevice,
    P: ScanDispatcher,
{
    pub fn new(device: D, dispatcher: P, status: StatusWriter, settings: ConnectionSettings) -> Self {
        Self {
            device,
            dispatcher,
            status,
            settings,
            machine: ConnectionStateMachine::new(),
            open_attempts: 0,
            scans_dispatched: 0,
            dispatch_failures: 0,
        }
    }

    /// Run the manager on its own task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<ConnectionSummary>
    where
        D: 'static,
        P: 'static,
    {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` is cancelled, or return at once if disabled.
    pub async fn run(mut self, shutdown: CancellationToken) -> ConnectionSummary {
        if !self.settings.enabled {
            warn!(device = self.device.name(), "{DEVICE_DISABLED_MESSAGE}");
            self.transition(ConnectionState::Faulted);
            self.status.mark_faulted(DEVICE_DISABLED_MESSAGE);
            return self.into_summary();
        }

        info!(device = self.device.name(), "Scanner connection manager started");

        loop {
            self.transition(ConnectionState::Opening);
            self.open_attempts += 1;

            let opened = tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                result = self.device.open() => Some(result),
            };

            let end = match opened {
                None => SessionEnd::Shutdown,
                Some(Err(e)) => SessionEnd::Fault(e),
                Some(Ok(())) => {
                    self.transition(ConnectionState::Open);
                    self.status.mark_available();
                    info!(device = self.device.name(), "Serial port opened");
                    self.read_session(&shutdown).await
                }
            };

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Fault(e) => {
                    self.fault(e).await;
                    if !pause(self.settings.reconnect_delay, &shutdown).await {
                        break;
                    }
                }
            }
        }

        self.device.close().await;
        info!(
            device = self.device.name(),
            state = %self.machine.current_state(),
            "Scanner connection manager stopped"
        );
        self.into_summary()
    }

    /// Read lines until the device fails or shutdown is requested.
    async fn read_session(&mut self, shutdown: &CancellationToken) -> SessionEnd {
        loop {
            let outcome = tokio::select! {
                biased;
                () = shutdown.cancelled() => return SessionEnd::Shutdown,
                outcome = self.device.read_line() => outcome,
            };

            let event = match outcome {
                Ok(ReadOutcome::Line(line)) => ScanEvent::from_serial_line(&line),
                Ok(ReadOutcome::TimedOut) => None,
                Err(e) => return SessionEnd::Fault(e),
            };

            match event {
                Some(event) => self.forward(event, shutdown).await,
                None => {
                    trace!("No scan data, idling");
                    if !pause(self.settings.poll_delay, shutdown).await {
                        return SessionEnd::Shutdown;
                    }
                }
            }
        }
    }

    async fn forward(&mut self, event: ScanEvent, shutdown: &CancellationToken) {
        let payload = event.payload().to_string();
        info!(payload = %payload, "Scan read from serial port");

        match self.dispatcher.dispatch_event(event, shutdown).await {
            Ok(outcome) => {
                self.scans_dispatched += 1;
                debug!(
                    payload = %payload,
                    accepted = outcome.accepted,
                    "Serial scan forwarded"
                );
            }
            Err(e) if e.is_cancelled() => {
                debug!(payload = %payload, "Serial scan dispatch cancelled by shutdown");
            }
            Err(e) => {
                self.dispatch_failures += 1;
                error!(payload = %payload, error = %e, "Failed to dispatch serial scan");
            }
        }
    }

    /// Publish the fault and release the handle.
    async fn fault(&mut self, error: HardwareError) {
        let message = format!("{DEVICE_UNAVAILABLE_PREFIX}: {error}");
        error!(device = self.device.name(), error = %error, "{DEVICE_UNAVAILABLE_PREFIX}");

        self.transition(ConnectionState::Faulted);
        self.status.mark_faulted(message);
        self.device.close().await;
    }

    fn transition(&mut self, to: ConnectionState) {
        match self.machine.transition_to(to) {
            Ok(t) => debug!(from = %t.from, to = %t.to, "Connection state changed"),
            Err(e) => warn!(error = %e, "Connection state change rejected"),
        }
    }

    fn into_summary(self) -> ConnectionSummary {
        ConnectionSummary {
            final_state: self.machine.current_state(),
            transition_count: self.machine.transition_count(),
            transitions: self.machine.history().iter().cloned().collect(),
            open_attempts: self.open_attempts,
            scans_dispatched: self.scans_dispatched,
            dispatch_failures: self.dispatch_failures,
        }
    }
}

/// Sleep for `delay`. Returns false if shutdown interrupted the wait.
async fn pause(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
