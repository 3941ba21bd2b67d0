//! Scanner backend transport.
//!
//! [`ScanBackend`] is a single remote call with no retry logic; the retry
//! policy lives in [`DispatchClient`](crate::DispatchClient). The production
//! implementation talks gRPC over a lazily connected tonic channel, so the
//! process starts even while the backend is down.

use crate::rpc::{ScanReply, ScanRequest, ScannerBackendClient};
use std::future::Future;
use std::time::Duration;
use tablelink_core::BackendSettings;
use thiserror::Error;
use tonic::Code;
use tonic::transport::Endpoint;
use tracing::{debug, info};

/// Errors from a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Endpoint URI in configuration cannot be used.
    #[error("Invalid backend endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Connection or I/O failure below the RPC layer.
    #[error("Backend transport error: {0}")]
    Transport(String),

    /// The backend answered with a gRPC error status.
    #[error("Backend returned {code:?}: {message}")]
    Status { code: Code, message: String },
}

impl BackendError {
    /// Whether another attempt could succeed.
    ///
    /// Transport failures and transient status codes are retryable;
    /// everything else fails fast. A request that outlives the channel's
    /// request timeout surfaces as `Cancelled` ("Timeout expired").
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidEndpoint { .. } => false,
            Self::Transport(_) => true,
            Self::Status { code, .. } => matches!(
                code,
                Code::Unavailable
                    | Code::DeadlineExceeded
                    | Code::ResourceExhausted
                    | Code::Aborted
                    | Code::Unknown
                    | Code::Internal
                    | Code::Cancelled
            ),
        }
    }
}

impl From<tonic::Status> for BackendError {
    fn from(status: tonic::Status) -> Self {
        Self::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<tonic::transport::Error> for BackendError {
    fn from(error: tonic::transport::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// One remote `SubmitScan` call.
pub trait ScanBackend: Send + Sync {
    /// Send `request` once.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`]; [`BackendError::is_retryable`] tells the
    /// caller whether to try again.
    fn submit_scan(
        &self,
        request: ScanRequest,
    ) -> impl Future<Output = Result<ScanReply, BackendError>> + Send;
}

/// Connection options for [`GrpcScanBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcBackendConfig {
    /// Backend URI, e.g. `http://localhost:7100`.
    pub endpoint: String,

    /// Per-request deadline.
    pub request_timeout: Duration,

    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
}

impl From<&BackendSettings> for GrpcBackendConfig {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            request_timeout: settings.request_timeout(),
            connect_timeout: settings.connect_timeout(),
        }
    }
}

/// gRPC implementation of [`ScanBackend`].
///
/// Cheap to clone; clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct GrpcScanBackend {
    client: ScannerBackendClient,
}

impl GrpcScanBackend {
    /// Build the channel without connecting.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if the URI cannot be parsed.
    pub fn connect_lazy(config: &GrpcBackendConfig) -> Result<Self, BackendError> {
        let endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| BackendError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                message: e.to_string(),
            })?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);

        info!(endpoint = %config.endpoint, "Scanner backend channel configured");

        Ok(Self {
            client: ScannerBackendClient::new(endpoint.connect_lazy()),
        })
    }
}

impl ScanBackend for GrpcScanBackend {
    async fn submit_scan(&self, request: ScanRequest) -> Result<ScanReply, BackendError> {
        debug!(
            table_id = %request.table_id,
            source = %request.source,
            "Calling SubmitScan"
        );

        let mut client = self.client.clone();
        let response = client.submit_scan(request).await?;
        Ok(response.into_inner())
    }
}
