//! Scanner connection state machine.
//!
//! # States
//!
//! - `Closed`: no handle held, nothing attempted yet
//! - `Opening`: acquiring the port
//! - `Open`: reading lines
//! - `Faulted`: the last open or read failed, or the reader is disabled
//!
//! # Valid Transitions
//!
//! - Closed → Opening → Open → Faulted → Opening
//! - Opening → Faulted
//! - Closed → Faulted (reader disabled by configuration)
//!
//! # Examples
//!
//! ```
//! use tablelink_hardware::state::{ConnectionState, ConnectionStateMachine};
//!
//! let mut machine = ConnectionStateMachine::new();
//! machine.transition_to(ConnectionState::Opening).unwrap();
//! machine.transition_to(ConnectionState::Open).unwrap();
//!
//! assert!(machine.transition_to(ConnectionState::Closed).is_err());
//! assert_eq!(machine.current_state(), ConnectionState::Open);
//! ```

use crate::error::{HardwareError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Maximum number of transitions kept in history.
const MAX_HISTORY_SIZE: usize = 100;

/// Connection state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No handle held and nothing attempted yet.
    Closed,

    /// Acquiring the port.
    Opening,

    /// Port open, lines are being read.
    Open,

    /// Last open or read failed, or the reader is disabled.
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ConnectionState::Closed => "Closed",
            ConnectionState::Opening => "Opening",
            ConnectionState::Open => "Open",
            ConnectionState::Faulted => "Faulted",
        };
        write!(f, "{state_str}")
    }
}

impl ConnectionState {
    /// Check if transition to `target` is valid from this state.
    ///
    /// ```
    /// use tablelink_hardware::state::ConnectionState;
    ///
    /// assert!(ConnectionState::Faulted.can_transition_to(&ConnectionState::Opening));
    /// assert!(!ConnectionState::Closed.can_transition_to(&ConnectionState::Open));
    /// ```
    pub fn can_transition_to(&self, target: &ConnectionState) -> bool {
        matches!(
            (self, target),
            (
                ConnectionState::Closed,
                ConnectionState::Opening | ConnectionState::Faulted
            ) | (
                ConnectionState::Opening,
                ConnectionState::Open | ConnectionState::Faulted
            ) | (ConnectionState::Open, ConnectionState::Faulted)
                | (ConnectionState::Faulted, ConnectionState::Opening)
        )
    }
}

/// A single recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: ConnectionState,

    /// The state transitioned to.
    pub to: ConnectionState,

    /// Wall-clock time of the transition.
    pub timestamp: DateTime<Utc>,
}

impl StateTransition {
    /// Record a transition happening now.
    pub fn new(from: ConnectionState, to: ConnectionState) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
        }
    }
}

/// Tracks the connection state and a bounded transition history.
///
/// Owned by the connection manager task; not shared.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    current_state: ConnectionState,
    history: VecDeque<StateTransition>,
    transition_count: u64,
}

impl ConnectionStateMachine {
    /// Create a machine in the `Closed` state.
    pub fn new() -> Self {
        Self {
            current_state: ConnectionState::Closed,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            transition_count: 0,
        }
    }

    /// Current state.
    pub fn current_state(&self) -> ConnectionState {
        self.current_state
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Total transitions performed, including those evicted from history.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Transition to `new_state`, validating the move.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the move is not allowed from the
    /// current state. The state is left unchanged.
    pub fn transition_to(&mut self, new_state: ConnectionState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(HardwareError::InvalidTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        self.transition_count += 1;

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
