//! Ingress gateway for status queries and simulated scans.
//!
//! The gateway only reads the status register. A simulated scan goes through
//! the same dispatcher as hardware scans, after two checks: the payload must
//! not be blank, and while the hardware is offline mocking must be allowed.

use serde::{Deserialize, Serialize};
use tablelink_core::constants::{MOCKING_DISABLED_MESSAGE, PAYLOAD_REQUIRED_MESSAGE};
use tablelink_core::{
    DispatchError, ScanDispatcher, ScanEvent, ScanSource, StatusReader, StatusSnapshot,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Failure of a gateway operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Request body is unusable.
    #[error("{0}")]
    Validation(String),

    /// Request is well formed but refused in the current state.
    #[error("{0}")]
    Policy(String),

    /// The dispatcher gave up.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Body of `POST /scanner/simulate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Result of a simulated scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    pub accepted: bool,
    pub message: String,
    pub source: String,
    /// True when the scan was injected while the hardware was offline.
    pub mocked: bool,
}

/// Body of `GET /scanner/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub hardware_available: bool,
}

/// Status reads and simulated scan submission.
#[derive(Debug)]
pub struct IngressGateway<P> {
    status: StatusReader,
    dispatcher: P,
    allow_mock_when_unavailable: bool,
    shutdown: CancellationToken,
}

impl<P: ScanDispatcher> IngressGateway<P> {
    /// `shutdown` is handed to every dispatch so retry waits end with the
    /// process.
    pub fn new(
        status: StatusReader,
        dispatcher: P,
        allow_mock_when_unavailable: bool,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            status,
            dispatcher,
            allow_mock_when_unavailable,
            shutdown,
        }
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            hardware_available: self.status.hardware_available(),
        }
    }

    pub fn diagnostics(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Validate, gate and forward a simulated scan.
    ///
    /// # Errors
    ///
    /// - `Validation` if the payload is missing or blank
    /// - `Policy` if the hardware is offline and mocking is not allowed
    /// - `Dispatch` if the dispatcher fails or is cancelled
    pub async fn submit_simulated(
        &self,
        request: SimulateRequest,
    ) -> Result<SimulateResponse, GatewayError> {
        let source = ScanSource::normalize(request.source.as_deref());
        let event = ScanEvent::new(request.payload.as_deref().unwrap_or_default(), source)
            .map_err(|_| GatewayError::Validation(PAYLOAD_REQUIRED_MESSAGE.to_string()))?;

        let hardware_available = self.status.hardware_available();
        if !hardware_available && !self.allow_mock_when_unavailable {
            warn!(source = %event.source(), "Simulated scan refused while scanner offline");
            return Err(GatewayError::Policy(MOCKING_DISABLED_MESSAGE.to_string()));
        }

        let source = event.source().as_str().to_string();
        debug!(source = %source, mocked = !hardware_available, "Forwarding simulated scan");

        let outcome = self
            .dispatcher
            .dispatch_event(event, &self.shutdown)
            .await?;

        info!(
            source = %source,
            accepted = outcome.accepted,
            mocked = !hardware_available,
            "Simulated scan dispatched"
        );

        Ok(SimulateResponse {
            accepted: outcome.accepted,
            message: outcome.message,
            source,
            mocked: !hardware_available,
        })
    }
}
