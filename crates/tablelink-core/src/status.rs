//! Status register shared between the device loop and its observers.
//!
//! The register holds the projection of the device connection state: whether
//! hardware is available and the last fatal error. It has exactly one writer
//! (the connection manager) and any number of readers.
//!
//! # Ownership
//!
//! [`StatusRegister::new`] returns a [`StatusWriter`] and a [`StatusReader`].
//! The writer is not `Clone`, so the single-writer rule is enforced by the
//! type system; readers can be cloned freely.
//!
//! ```
//! use tablelink_core::StatusRegister;
//!
//! let (writer, reader) = StatusRegister::new();
//! assert!(!reader.hardware_available());
//!
//! writer.set_hardware_available(true);
//! assert!(reader.hardware_available());
//! ```
//!
//! # Consistency
//!
//! Each field is guarded by its own primitive and updated independently. A
//! reader may observe `hardware_available == false` while `fatal_error` still
//! holds the previous message (or none) for the short window between the two
//! writes. The writer always clears availability before publishing an error.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Point-in-time view of both fields, read one after the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub hardware_available: bool,
    pub fatal_error: Option<String>,
}

/// Backing storage for the status projection.
#[derive(Debug, Default)]
pub struct StatusRegister {
    hardware_available: AtomicBool,
    fatal_error: RwLock<Option<String>>,
}

impl StatusRegister {
    /// Create a register with hardware unavailable and no error.
    ///
    /// Returns the single writer handle and a cloneable reader handle.
    pub fn new() -> (StatusWriter, StatusReader) {
        let register = Arc::new(Self::default());
        (
            StatusWriter {
                register: Arc::clone(&register),
            },
            StatusReader { register },
        )
    }

    fn hardware_available(&self) -> bool {
        self.hardware_available.load(Ordering::Acquire)
    }

    fn fatal_error(&self) -> Option<String> {
        self.fatal_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Exclusive write handle, owned by the connection manager.
#[derive(Debug)]
pub struct StatusWriter {
    register: Arc<StatusRegister>,
}

impl StatusWriter {
    pub fn set_hardware_available(&self, available: bool) {
        self.register
            .hardware_available
            .store(available, Ordering::Release);
    }

    pub fn set_fatal_error(&self, error: Option<String>) {
        *self
            .register
            .fatal_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Publish a healthy device: available, error cleared.
    pub fn mark_available(&self) {
        self.set_hardware_available(true);
        self.set_fatal_error(None);
    }

    /// Publish a faulted device: availability first, then the error text.
    pub fn mark_faulted(&self, error: impl Into<String>) {
        self.set_hardware_available(false);
        self.set_fatal_error(Some(error.into()));
    }

    /// Reader for the same register.
    pub fn reader(&self) -> StatusReader {
        StatusReader {
            register: Arc::clone(&self.register),
        }
    }
}

/// Shared read handle.
#[derive(Debug, Clone)]
pub struct StatusReader {
    register: Arc<StatusRegister>,
}

impl StatusReader {
    #[must_use]
    pub fn hardware_available(&self) -> bool {
        self.register.hardware_available()
    }

    #[must_use]
    pub fn fatal_error(&self) -> Option<String> {
        self.register.fatal_error()
    }

    /// Read both fields. Availability is read first.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            hardware_available: self.hardware_available(),
            fatal_error: self.fatal_error(),
        }
    }
}
