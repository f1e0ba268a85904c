//! Session lifecycle for the Bloom client.
//!
//! [`SessionStore`] owns the explicit session state machine, restores and
//! verifies stored sessions on startup, runs login/registration/logout, and
//! persists the resulting credential pair and cached user record through
//! `bloom-storage`. All network traffic goes through the `bloom-api` client,
//! so token attachment and renewal are transparent here.

mod error;
mod session_fsm;
mod store;

pub use error::{AuthError, AuthResult};
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use store::{
    LoginRequest, RegisterRequest, SessionSnapshot, SessionStore, UserInfo, PROFILE_PATH,
};
