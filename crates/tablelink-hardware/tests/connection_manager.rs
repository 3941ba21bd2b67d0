//! Integration tests for DeviceConnectionManager
//!
//! All tests run on a paused clock, so reconnect and poll delays elapse
//! instantly while keeping their ordering.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tablelink_core::constants::DEVICE_DISABLED_MESSAGE;
use tablelink_core::{DispatchError, DispatchOutcome, ScanDispatcher, StatusReader, StatusRegister};
use tablelink_hardware::mock::{MockScanner, MockScannerHandle};
use tablelink_hardware::{
    ConnectionSettings, ConnectionState, ConnectionSummary, DeviceConnectionManager,
    HardwareError,
};
use tablelink_network::{IngressGateway, SimulateRequest};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl Recorder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ScanDispatcher for Recorder {
    async fn dispatch(
        &self,
        payload: &str,
        source: &str,
        _cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push((payload.to_string(), source.to_string()));

        if self.fail {
            Err(DispatchError::Exhausted {
                attempts: 6,
                last_error: "backend unavailable".into(),
            })
        } else {
            Ok(DispatchOutcome::new(true, "stored"))
        }
    }
}

struct Harness {
    handle: MockScannerHandle,
    status: StatusReader,
    dispatcher: Arc<Recorder>,
    shutdown: CancellationToken,
    task: JoinHandle<ConnectionSummary>,
}

impl Harness {
    fn start(dispatcher: Recorder, configure: impl FnOnce(&MockScannerHandle)) -> Self {
        let (scanner, handle) = MockScanner::new();
        let scanner = scanner.with_read_timeout(Duration::from_millis(100));
        configure(&handle);

        let (writer, status) = StatusRegister::new();
        let dispatcher = Arc::new(dispatcher);
        let shutdown = CancellationToken::new();

        let settings = ConnectionSettings {
            enabled: true,
            poll_delay: Duration::from_millis(200),
            reconnect_delay: Duration::from_secs(5),
        };

        let task = DeviceConnectionManager::new(scanner, Arc::clone(&dispatcher), writer, settings)
            .spawn(shutdown.clone());

        Self {
            handle,
            status,
            dispatcher,
            shutdown,
            task,
        }
    }

    async fn stop(self) -> ConnectionSummary {
        self.shutdown.cancel();
        self.task.await.unwrap()
    }
}

/// Poll `condition` on the paused clock until it holds.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn test_scan_line_is_trimmed_and_dispatched() {
    let harness = Harness::start(Recorder::default(), |_| {});
    wait_until(|| harness.status.hardware_available()).await;

    harness.handle.send_line("  XYZ123\n").await.unwrap();
    wait_until(|| !harness.dispatcher.calls().is_empty()).await;

    assert_eq!(
        harness.dispatcher.calls(),
        vec![("XYZ123".to_string(), "serial".to_string())]
    );
    assert!(harness.status.hardware_available());
    assert_eq!(harness.status.fatal_error(), None);

    let summary = harness.stop().await;
    assert_eq!(summary.scans_dispatched, 1);
    assert_eq!(summary.dispatch_failures, 0);
    assert_eq!(summary.final_state, ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_blank_lines_are_not_dispatched() {
    let harness = Harness::start(Recorder::default(), |_| {});
    wait_until(|| harness.status.hardware_available()).await;

    harness.handle.send_line("\n").await.unwrap();
    harness.handle.send_line("   \r\n").await.unwrap();
    harness.handle.send_line("A1\r\n").await.unwrap();
    wait_until(|| !harness.dispatcher.calls().is_empty()).await;

    assert_eq!(
        harness.dispatcher.calls(),
        vec![("A1".to_string(), "serial".to_string())]
    );
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_disabled_device_publishes_fixed_error() {
    let (scanner, handle) = MockScanner::new();
    let (writer, status) = StatusRegister::new();
    let settings = ConnectionSettings {
        enabled: false,
        ..ConnectionSettings::default()
    };

    let summary = DeviceConnectionManager::new(scanner, Arc::new(Recorder::default()), writer, settings)
        .run(CancellationToken::new())
        .await;

    assert!(!status.hardware_available());
    assert_eq!(status.fatal_error().as_deref(), Some(DEVICE_DISABLED_MESSAGE));
    assert_eq!(summary.transition_count, 1);
    assert_eq!(summary.transitions[0].from, ConnectionState::Closed);
    assert_eq!(summary.transitions[0].to, ConnectionState::Faulted);
    assert_eq!(summary.open_attempts, 0);
    assert_eq!(handle.open_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_reconnects_after_delay() {
    let harness = Harness::start(Recorder::default(), |handle| {
        handle.fail_next_open(HardwareError::permission_denied("Mock Scanner"));
    });

    wait_until(|| harness.status.fatal_error().is_some()).await;
    assert!(!harness.status.hardware_available());
    assert_eq!(
        harness.status.fatal_error().as_deref(),
        Some("Serial port unavailable: Permission denied: Mock Scanner")
    );
    assert_eq!(harness.handle.open_attempts(), 1);

    wait_until(|| harness.status.hardware_available()).await;
    assert_eq!(harness.status.fatal_error(), None);
    assert_eq!(harness.handle.open_attempts(), 2);

    let summary = harness.stop().await;
    assert_eq!(summary.open_attempts, 2);
    assert_eq!(summary.final_state, ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_read_fault_releases_handle_and_recovers() {
    let harness = Harness::start(Recorder::default(), |_| {});
    wait_until(|| harness.status.hardware_available()).await;

    harness
        .handle
        .inject_fault(HardwareError::disconnected("Mock Scanner"))
        .await
        .unwrap();

    wait_until(|| !harness.status.hardware_available()).await;
    assert_eq!(
        harness.status.fatal_error().as_deref(),
        Some("Serial port unavailable: Device disconnected: Mock Scanner")
    );
    assert_eq!(harness.handle.close_count(), 1);

    wait_until(|| harness.status.hardware_available()).await;
    harness.handle.send_line("B2\n").await.unwrap();
    wait_until(|| !harness.dispatcher.calls().is_empty()).await;

    let summary = harness.stop().await;
    let states: Vec<_> = summary.transitions.iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            ConnectionState::Opening,
            ConnectionState::Open,
            ConnectionState::Faulted,
            ConnectionState::Opening,
            ConnectionState::Open,
        ]
    );
    assert_eq!(summary.scans_dispatched, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_failure_keeps_connection_open() {
    let harness = Harness::start(Recorder::failing(), |_| {});
    wait_until(|| harness.status.hardware_available()).await;

    harness.handle.send_line("C3\n").await.unwrap();
    wait_until(|| !harness.dispatcher.calls().is_empty()).await;

    assert!(harness.status.hardware_available());
    assert_eq!(harness.status.fatal_error(), None);

    let summary = harness.stop().await;
    assert_eq!(summary.dispatch_failures, 1);
    assert_eq!(summary.scans_dispatched, 0);
    assert_eq!(summary.final_state, ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_reconnect_wait() {
    let harness = Harness::start(Recorder::default(), |handle| {
        handle.fail_next_open(HardwareError::disconnected("Mock Scanner"));
    });
    wait_until(|| harness.status.fatal_error().is_some()).await;

    let started = tokio::time::Instant::now();
    let handle = harness.handle.clone();
    let summary = harness.stop().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.final_state, ConnectionState::Faulted);
    assert_eq!(summary.open_attempts, 1);
    assert_eq!(handle.open_attempts(), 1);
}

/// Holds every dispatch until a permit is released.
struct Gated {
    calls: Mutex<Vec<(String, String)>>,
    release: Semaphore,
}

impl Gated {
    fn closed() -> Self {
        Self {
            calls: Mutex::default(),
            release: Semaphore::new(0),
        }
    }
}

impl ScanDispatcher for Gated {
    async fn dispatch(
        &self,
        payload: &str,
        source: &str,
        _cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push((payload.to_string(), source.to_string()));
        self.release.acquire().await.unwrap().forget();
        Ok(DispatchOutcome::new(true, "stored"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_read_fault_does_not_disturb_simulated_dispatch() {
    let (scanner, handle) = MockScanner::new();
    let scanner = scanner.with_read_timeout(Duration::from_millis(100));
    let (writer, status) = StatusRegister::new();
    let dispatcher = Arc::new(Gated::closed());
    let shutdown = CancellationToken::new();

    let manager = DeviceConnectionManager::new(
        scanner,
        Arc::clone(&dispatcher),
        writer,
        ConnectionSettings {
            enabled: true,
            poll_delay: Duration::from_millis(200),
            reconnect_delay: Duration::from_secs(5),
        },
    )
    .spawn(shutdown.clone());
    wait_until(|| status.hardware_available()).await;

    let gateway = Arc::new(IngressGateway::new(
        status.clone(),
        Arc::clone(&dispatcher),
        false,
        shutdown.clone(),
    ));
    let simulated = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move {
            gateway
                .submit_simulated(SimulateRequest {
                    payload: Some("SIM-1".into()),
                    source: None,
                })
                .await
        }
    });
    wait_until(|| dispatcher.calls.lock().unwrap().len() == 1).await;

    handle
        .inject_fault(HardwareError::disconnected("Mock Scanner"))
        .await
        .unwrap();
    wait_until(|| !status.hardware_available()).await;
    assert_eq!(
        status.fatal_error().as_deref(),
        Some("Serial port unavailable: Device disconnected: Mock Scanner")
    );
    assert!(!simulated.is_finished());

    dispatcher.release.add_permits(1);
    let response = simulated.await.unwrap().unwrap();
    assert!(response.accepted);
    assert_eq!(response.source, "simulated");
    assert!(!response.mocked);
    assert_eq!(
        *dispatcher.calls.lock().unwrap(),
        vec![("SIM-1".to_string(), "simulated".to_string())]
    );

    shutdown.cancel();
    let summary = manager.await.unwrap();
    assert!(
        summary
            .transitions
            .iter()
            .any(|t| t.to == ConnectionState::Faulted)
    );
    assert_eq!(summary.scans_dispatched, 0);
}
