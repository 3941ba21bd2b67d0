//! Retrying scan dispatch client.
//!
//! Wraps one [`ScanBackend`] call in an exponential-backoff retry policy:
//!
//! ```text
//! attempt 1 ──fail──► wait 2^1·base ──► attempt 2 ──fail──► wait 2^2·base ──► ...
//! ```
//!
//! At most `retry_count` retries follow the first attempt. Only retryable
//! backend errors are retried; anything else is returned at once. Waits are
//! raced against the caller's cancellation token, while a call already in
//! flight is left to finish.
//!
//! # Example Usage
//!
//! ```no_run
//! use tablelink_core::{BackendSettings, ScanDispatcher};
//! use tablelink_network::{DispatchClient, DispatchConfig, GrpcBackendConfig, GrpcScanBackend};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = BackendSettings::default();
//! let backend = GrpcScanBackend::connect_lazy(&GrpcBackendConfig::from(&settings))?;
//! let client = DispatchClient::new(backend, DispatchConfig::from(&settings));
//!
//! let outcome = client
//!     .dispatch("04ABCDEF", "serial", &CancellationToken::new())
//!     .await?;
//! println!("accepted: {}", outcome.accepted);
//! # Ok(())
//! # }
//! ```

use crate::backend::ScanBackend;
use crate::rpc::ScanRequest;
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tablelink_core::{BackendSettings, DispatchError, DispatchOutcome, ScanDispatcher};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Retry policy and request constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Table identifier stamped on every request.
    pub table_id: String,

    /// Retries after the first attempt.
    pub retry_count: u32,

    /// Base of the exponential backoff.
    pub base_retry_delay: Duration,
}

impl From<&BackendSettings> for DispatchConfig {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            table_id: settings.table_id.clone(),
            retry_count: settings.retry_count,
            base_retry_delay: settings.base_retry_delay(),
        }
    }
}

/// Waits between retries.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Delay before retry number `retry` (1-based): `2^retry * base`.
#[must_use]
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
}

/// Retrying client over a [`ScanBackend`].
#[derive(Debug, Clone)]
pub struct DispatchClient<B, S = TokioSleeper> {
    backend: B,
    sleeper: S,
    config: DispatchConfig,
}

impl<B: ScanBackend> DispatchClient<B> {
    pub fn new(backend: B, config: DispatchConfig) -> Self {
        Self::with_sleeper(backend, TokioSleeper, config)
    }
}

impl<B: ScanBackend, S: Sleeper> DispatchClient<B, S> {
    /// Create a client with a custom wait strategy.
    pub fn with_sleeper(backend: B, sleeper: S, config: DispatchConfig) -> Self {
        Self {
            backend,
            sleeper,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn request(&self, payload: &str, source: &str) -> ScanRequest {
        ScanRequest {
            table_id: self.config.table_id.clone(),
            payload: payload.to_string(),
            source: source.to_string(),
            captured_at_unix: Utc::now().timestamp(),
        }
    }
}

impl<B: ScanBackend, S: Sleeper> ScanDispatcher for DispatchClient<B, S> {
    async fn dispatch(
        &self,
        payload: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let max_attempts = self.config.retry_count.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.backend.submit_scan(self.request(payload, source)).await {
                Ok(reply) => {
                    info!(
                        source,
                        accepted = reply.accepted,
                        message = %reply.message,
                        "Sent scan payload"
                    );
                    return Ok(DispatchOutcome::new(reply.accepted, reply.message));
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                warn!(source, error = %error, "Scan rejected by backend");
                return Err(DispatchError::Rejected(error.to_string()));
            }

            if attempt >= max_attempts {
                error!(source, attempts = attempt, error = %error, "Giving up on scan dispatch");
                return Err(DispatchError::Exhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = backoff_delay(self.config.base_retry_delay, attempt);
            warn!(
                attempt,
                delay_secs = delay.as_secs_f64(),
                error = %error,
                "Retrying gRPC send"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DispatchError::Cancelled),
                () = self.sleeper.sleep(delay) => {}
            }
        }
    }
}
