//! Dispatch seam between scan producers and the backend client.
//!
//! Both the device loop and the HTTP gateway forward scans through a
//! [`ScanDispatcher`]. The production implementation is the retrying gRPC
//! client in `tablelink-network`; tests substitute recording fakes.

use crate::types::{DispatchOutcome, ScanEvent};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure of a dispatch after the retry policy has run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Every attempt failed with a retryable error.
    #[error("Dispatch failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// The backend returned an error that must not be retried.
    #[error("Dispatch rejected: {0}")]
    Rejected(String),

    /// Shutdown was requested while waiting to retry.
    #[error("Dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Whether the failure was caused by shutdown rather than the backend.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Forwards scans to the backend.
///
/// Implementations must be shareable across tasks: the device loop and any
/// number of HTTP handlers call `dispatch` concurrently.
pub trait ScanDispatcher: Send + Sync {
    /// Submit one payload tagged with its source.
    ///
    /// `cancel` aborts the operation at retry wait boundaries; a remote call
    /// already in flight is allowed to finish.
    fn dispatch(
        &self,
        payload: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<DispatchOutcome, DispatchError>> + Send;

    /// Submit a scan event, consuming it.
    fn dispatch_event(
        &self,
        event: ScanEvent,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<DispatchOutcome, DispatchError>> + Send {
        async move {
            self.dispatch(event.payload(), event.source().as_str(), cancel)
                .await
        }
    }
}

impl<T: ScanDispatcher> ScanDispatcher for Arc<T> {
    fn dispatch(
        &self,
        payload: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<DispatchOutcome, DispatchError>> + Send {
        (**self).dispatch(payload, source, cancel)
    }
}
