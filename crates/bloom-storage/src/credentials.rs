//! High-level API for the persisted credential pair and cached user record.

use crate::{SecureStorage, StorageKeys};
use serde_json::Value;
use tracing::warn;

/// Single owner of the persisted credential pair.
///
/// Reads fail open: a storage error is logged and collapses to `None`, so a
/// broken keychain degrades to an unauthenticated session instead of a crash.
/// Writes and deletes are best-effort: a failure is logged and not
/// propagated, since the in-memory session must proceed regardless.
pub struct CredentialStore {
    storage: Box<dyn SecureStorage>,
}

impl CredentialStore {
    /// Create a new credential store with the given storage backend
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Token pair
    // ==========================================

    /// Retrieve the access token, or `None` if absent or unreadable.
    pub fn get_access_token(&self) -> Option<String> {
        self.read(StorageKeys::ACCESS_TOKEN)
    }

    /// Retrieve the refresh token, or `None` if absent or unreadable.
    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(StorageKeys::REFRESH_TOKEN)
    }

    /// Persist both tokens. Best-effort: failures are logged, not propagated.
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.write(StorageKeys::ACCESS_TOKEN, access_token);
        self.write(StorageKeys::REFRESH_TOKEN, refresh_token);
    }

    /// Delete both token entries. Idempotent if already absent.
    pub fn clear_tokens(&self) {
        self.remove(StorageKeys::ACCESS_TOKEN);
        self.remove(StorageKeys::REFRESH_TOKEN);
    }

    /// True if both tokens are present.
    pub fn has_tokens(&self) -> bool {
        self.get_access_token().is_some() && self.get_refresh_token().is_some()
    }

    // ==========================================
    // Cached user record
    // ==========================================

    /// Retrieve the cached user record, or `None` if absent or unparsable.
    pub fn get_cached_user(&self) -> Option<Value> {
        let json = self.read(StorageKeys::USER_INFO)?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Cached user record is not valid JSON, ignoring");
                None
            }
        }
    }

    /// Persist the cached user record. Best-effort.
    pub fn set_cached_user(&self, user: &Value) {
        match serde_json::to_string(user) {
            Ok(json) => self.write(StorageKeys::USER_INFO, &json),
            Err(e) => warn!(error = %e, "Failed to serialize cached user record"),
        }
    }

    /// Delete the cached user record. Idempotent.
    pub fn clear_cached_user(&self) {
        self.remove(StorageKeys::USER_INFO);
    }

    /// Clear every entry this store owns.
    pub fn clear_all(&self) {
        self.clear_tokens();
        self.clear_cached_user();
    }

    // ==========================================
    // Fail-open primitives
    // ==========================================

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Secure storage read failed, treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(key = %key, error = %e, "Secure storage write failed, in-memory session may diverge");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.delete(key) {
            warn!(key = %key, error = %e, "Secure storage delete failed");
        }
    }
}
