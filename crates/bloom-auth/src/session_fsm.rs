//! Session lifecycle state machine using rust-fsm.
//!
//! The session store drives an explicit finite state machine instead of
//! deriving its state from storage checks scattered across call sites.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Uninitialized  │ (initial)
//! └────────┬────────┘
//!          │ InitializeRequested
//!          ▼
//! ┌─────────────────┐  SessionVerified   ┌─────────────────┐
//! │  Initializing   │ ─────────────────► │  Authenticated  │
//! └────────┬────────┘                    └───────┬─┬───────┘
//!          │ NoSession /                         │ │
//!          │ VerificationFailed   SessionPurged  │ │ LogoutRequested
//!          ▼                  ◄─────────────────┘ │
//! ┌─────────────────┐                             ▼
//! │    Anonymous    │ ◄───────────────── ┌─────────────────┐
//! └────────┬────────┘   LogoutComplete   │   LoggingOut    │
//!          │ LoginAttempt                └─────────────────┘
//!          ▼
//! ┌─────────────────┐  LoginSucceeded ──► Authenticated
//! │    LoggingIn    │
//! └─────────────────┘  LoginFailed ─────► Anonymous
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates the `session_machine` module with State, Input, and the
// StateMachine type alias.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Uninitialized)

    Uninitialized => {
        InitializeRequested => Initializing
    },
    Initializing => {
        // Stored session confirmed against the server
        SessionVerified => Authenticated,
        // No stored credentials at all
        NoSession => Anonymous,
        // Stored session rejected or unverifiable
        VerificationFailed => Anonymous
    },
    Anonymous => {
        LoginAttempt => LoggingIn
    },
    LoggingIn => {
        LoginSucceeded => Authenticated,
        LoginFailed => Anonymous
    },
    Authenticated => {
        LogoutRequested => LoggingOut,
        // Renewal failed mid-flight and the credential pair was purged
        SessionPurged => Anonymous
    },
    LoggingOut => {
        LogoutComplete => Anonymous
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Simplified session state for external consumption (UI, callbacks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Store created, `initialize()` not yet called.
    Uninitialized,
    /// Restoring and verifying a stored session.
    Initializing,
    /// No valid session.
    Anonymous,
    /// Login request in flight.
    LoggingIn,
    /// Valid session with a current user.
    Authenticated,
    /// Logout request in flight.
    LoggingOut,
}

impl SessionState {
    /// True only for a verified, live session.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// True while an operation is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Initializing | SessionState::LoggingIn | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Uninitialized => SessionState::Uninitialized,
            SessionMachineState::Initializing => SessionState::Initializing,
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}
