//! Linux Secret Service implementation.

use crate::{SecureStorage, StorageError, StorageResult};
use secret_service::blocking::{Collection, SecretService};
use secret_service::EncryptionType;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

const MIME_TEXT: &str = "text/plain";

fn platform_err(e: impl Display) -> StorageError {
    StorageError::Platform(e.to_string())
}

/// Secure storage backed by the Secret Service D-Bus API
/// (GNOME Keyring, KWallet).
///
/// Sessions are not kept across calls; every operation opens a fresh D-Bus
/// connection, which keeps the type free of connection lifetimes at the cost
/// of a handshake per access. Token reads are rare enough that this does not
/// matter.
pub struct SecretServiceStorage {
    service_name: String,
}

impl SecretServiceStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        // Fail fast if no Secret Service provider is running.
        SecretService::connect(EncryptionType::Dh)
            .map_err(|e| StorageError::Platform(format!("Secret Service unavailable: {}", e)))?;

        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    /// Entries are identified by `{application, account}` attribute pairs
    /// under the default collection.
    fn attributes<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([("application", self.service_name.as_str()), ("account", key)])
    }

    fn with_collection<T>(
        &self,
        f: impl FnOnce(&Collection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let session = SecretService::connect(EncryptionType::Dh).map_err(platform_err)?;
        let collection = session.get_default_collection().map_err(platform_err)?;

        // The default collection may be locked after login on some desktops.
        if collection.is_locked().unwrap_or(false) {
            collection
                .unlock()
                .map_err(|e| StorageError::Platform(format!("Collection locked: {}", e)))?;
        }

        f(&collection)
    }
}

impl SecureStorage for SecretServiceStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Storing secret");

        let label = format!("{} ({})", self.service_name, key);
        self.with_collection(|collection| {
            collection
                .create_item(
                    &label,
                    self.attributes(key),
                    value.as_bytes(),
                    true, // replace an existing entry with the same attributes
                    MIME_TEXT,
                )
                .map_err(platform_err)?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Reading secret");

        self.with_collection(|collection| {
            let item = match collection
                .search_items(self.attributes(key))
                .map_err(platform_err)?
                .into_iter()
                .next()
            {
                Some(item) => item,
                None => return Ok(None),
            };

            let secret = item.get_secret().map_err(platform_err)?;
            String::from_utf8(secret)
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string()))
        })
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting secret");

        self.with_collection(|collection| {
            match collection
                .search_items(self.attributes(key))
                .map_err(platform_err)?
                .into_iter()
                .next()
            {
                Some(item) => {
                    item.delete().map_err(platform_err)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
