//! Session lifecycle store.
//!
//! Owns the session state machine, the current user record, and the
//! persistence of the credential pair produced by login/registration.

use crate::error::{AuthError, AuthResult};
use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionState};
use bloom_api::ApiClient;
use bloom_storage::CredentialStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Profile endpoint used to verify a restored session.
pub const PROFILE_PATH: &str = "/user/profile";

/// User record as the backend returns it. The field set tracks the product;
/// the HTTP layer treats it as opaque data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub phone: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Successful login/registration payload.
#[derive(Debug, Deserialize)]
struct AuthPayload {
    token: String,
    refresh_token: String,
    user: UserInfo,
}

/// Point-in-time view of the session, handed to the state-change callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub current_user: Option<UserInfo>,
    pub is_authenticated: bool,
    pub is_initialized: bool,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

type StateCallback = Box<dyn Fn(SessionSnapshot) + Send + Sync>;

struct Inner {
    machine: SessionMachine,
    user: Option<UserInfo>,
    is_initialized: bool,
    is_loading: bool,
    last_error: Option<String>,
}

/// Session store over the API client and the credential store.
///
/// All state mutation goes through the state machine; an operation that is
/// not legal in the current state fails with
/// [`AuthError::InvalidTransition`] before any network traffic.
pub struct SessionStore {
    api: Arc<ApiClient>,
    credentials: Arc<CredentialStore>,
    inner: Mutex<Inner>,
    callback: Mutex<Option<StateCallback>>,
}

impl SessionStore {
    pub fn new(api: Arc<ApiClient>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            api,
            credentials,
            inner: Mutex::new(Inner {
                machine: SessionMachine::new(),
                user: None,
                is_initialized: false,
                is_loading: false,
                last_error: None,
            }),
            callback: Mutex::new(None),
        }
    }

    /// Register the state-change callback. Fires after every settled
    /// transition with a fresh snapshot.
    pub fn on_state_change(&self, callback: StateCallback) {
        *self.callback.lock().unwrap_or_else(|e| e.into_inner()) = Some(callback);
    }

    /// Current point-in-time view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        Self::build_snapshot(&inner)
    }

    /// Current simplified state.
    pub fn state(&self) -> SessionState {
        SessionState::from(self.lock().machine.state())
    }

    /// True only for a verified, live session.
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    // ==========================================
    // Lifecycle operations
    // ==========================================

    /// Restore and verify a stored session.
    ///
    /// Idempotent: a second call returns immediately. Always settles with
    /// `is_initialized = true` and `is_loading = false`, whether the stored
    /// session was verified, rejected, or absent.
    pub async fn initialize(&self) -> AuthResult<()> {
        let has_session = {
            let mut inner = self.lock();
            if inner.is_initialized {
                debug!("Session store already initialized");
                return Ok(());
            }
            Self::consume(&mut inner, &SessionMachineInput::InitializeRequested)?;
            inner.is_loading = true;

            // Hydrate the cached user record so the UI can render
            // optimistically while the server verification is in flight.
            if let Some(cached) = self.credentials.get_cached_user() {
                match serde_json::from_value::<UserInfo>(cached) {
                    Ok(user) => inner.user = Some(user),
                    Err(e) => {
                        warn!(error = %e, "Cached user record has an unexpected shape, ignoring")
                    }
                }
            }

            self.credentials.get_access_token().is_some()
        };
        self.emit();

        if !has_session {
            let mut inner = self.lock();
            Self::consume(&mut inner, &SessionMachineInput::NoSession)?;
            inner.user = None;
            Self::settle(&mut inner);
            drop(inner);
            self.emit();
            info!("No stored session, settling anonymous");
            return Ok(());
        }

        let verification = self.api.get::<UserInfo>(PROFILE_PATH, &[]).await;

        let mut inner = self.lock();
        match verification {
            Ok(user) => {
                Self::consume(&mut inner, &SessionMachineInput::SessionVerified)?;
                self.cache_user(&user);
                inner.user = Some(user);
                inner.last_error = None;
                info!("Stored session verified");
            }
            Err(e) => {
                warn!(error = %e, "Stored session could not be verified, purging");
                Self::consume(&mut inner, &SessionMachineInput::VerificationFailed)?;
                self.credentials.clear_all();
                inner.user = None;
                inner.last_error = Some(e.message());
            }
        }
        Self::settle(&mut inner);
        drop(inner);
        self.emit();
        Ok(())
    }

    /// Log in with phone and password.
    pub async fn login(&self, request: &LoginRequest) -> AuthResult<UserInfo> {
        self.authenticate("/auth/login", request).await
    }

    /// Register a new account. Success establishes a session exactly as
    /// login does.
    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<UserInfo> {
        self.authenticate("/auth/register", request).await
    }

    /// Log out.
    ///
    /// The server call is best-effort: a failure is logged and ignored, and
    /// the local purge happens unconditionally.
    pub async fn logout(&self) -> AuthResult<()> {
        {
            let mut inner = self.lock();
            Self::consume(&mut inner, &SessionMachineInput::LogoutRequested)?;
            inner.is_loading = true;
        }
        self.emit();

        if let Err(e) = self
            .api
            .post::<Option<Value>, _>("/auth/logout", &serde_json::json!({}))
            .await
        {
            warn!(error = %e, "Logout request failed, purging locally anyway");
        }

        let mut inner = self.lock();
        Self::consume(&mut inner, &SessionMachineInput::LogoutComplete)?;
        self.credentials.clear_all();
        inner.user = None;
        inner.last_error = None;
        Self::settle(&mut inner);
        drop(inner);
        self.emit();
        info!("Logged out");
        Ok(())
    }

    /// Optimistic local update of the current user record: shallow-merge the
    /// given fields and persist the result. No server round-trip.
    pub fn update_user(&self, partial: &Value) -> AuthResult<UserInfo> {
        let mut inner = self.lock();
        let current = inner.user.as_ref().ok_or(AuthError::NotAuthenticated)?;

        let mut merged = serde_json::to_value(current)?;
        if let (Some(target), Some(source)) = (merged.as_object_mut(), partial.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        let updated: UserInfo = serde_json::from_value(merged)?;

        self.cache_user(&updated);
        inner.user = Some(updated.clone());
        drop(inner);
        self.emit();
        Ok(updated)
    }

    /// Drop to anonymous after the credential pair was purged mid-session
    /// (a renewal failure during an API call). No-op outside Authenticated.
    pub fn notify_session_expired(&self) {
        let mut inner = self.lock();
        if Self::consume(&mut inner, &SessionMachineInput::SessionPurged).is_err() {
            return;
        }
        warn!("Session expired, dropping to anonymous");
        self.credentials.clear_cached_user();
        inner.user = None;
        drop(inner);
        self.emit();
    }

    // ==========================================
    // Internals
    // ==========================================

    async fn authenticate<B: Serialize>(&self, path: &str, request: &B) -> AuthResult<UserInfo> {
        {
            let mut inner = self.lock();
            Self::consume(&mut inner, &SessionMachineInput::LoginAttempt)?;
            inner.is_loading = true;
            inner.last_error = None;
        }
        self.emit();

        let result = self.api.post::<AuthPayload, _>(path, request).await;

        let mut inner = self.lock();
        match result {
            Ok(payload) => {
                Self::consume(&mut inner, &SessionMachineInput::LoginSucceeded)?;
                self.credentials
                    .set_tokens(&payload.token, &payload.refresh_token);
                self.cache_user(&payload.user);
                inner.user = Some(payload.user.clone());
                Self::settle(&mut inner);
                drop(inner);
                self.emit();
                info!("Session established");
                Ok(payload.user)
            }
            Err(e) => {
                Self::consume(&mut inner, &SessionMachineInput::LoginFailed)?;
                inner.last_error = Some(e.message());
                Self::settle(&mut inner);
                drop(inner);
                self.emit();
                Err(e.into())
            }
        }
    }

    fn cache_user(&self, user: &UserInfo) {
        match serde_json::to_value(user) {
            Ok(value) => self.credentials.set_cached_user(&value),
            Err(e) => warn!(error = %e, "Failed to encode user record for caching"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn consume(inner: &mut Inner, input: &SessionMachineInput) -> AuthResult<()> {
        inner.machine.consume(input).map_err(|_| {
            AuthError::InvalidTransition(format!(
                "{:?} not valid in state {:?}",
                input,
                inner.machine.state()
            ))
        })?;
        Ok(())
    }

    fn settle(inner: &mut Inner) {
        inner.is_initialized = true;
        inner.is_loading = false;
    }

    fn build_snapshot(inner: &Inner) -> SessionSnapshot {
        let state = SessionState::from(inner.machine.state());
        SessionSnapshot {
            state,
            current_user: inner.user.clone(),
            is_authenticated: state.is_authenticated(),
            is_initialized: inner.is_initialized,
            is_loading: inner.is_loading,
            last_error: inner.last_error.clone(),
        }
    }

    fn emit(&self) {
        let snapshot = {
            let inner = self.lock();
            Self::build_snapshot(&inner)
        };
        let callback = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(callback) = callback.as_ref() {
            callback(snapshot);
        }
    }
}
