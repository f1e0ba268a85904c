//! macOS Keychain implementation.

use crate::{SecureStorage, StorageError, StorageResult};
use security_framework::item::{ItemClass, ItemSearchOptions, Limit, SearchResult};
use security_framework::passwords::{delete_generic_password, set_generic_password};
use tracing::debug;

/// True when a Security framework error means "no such item". The message
/// shape varies across macOS versions, so match loosely.
fn is_not_found(e: &security_framework::base::Error) -> bool {
    let text = e.to_string().to_lowercase();
    text.contains("not found") || text.contains("-25300") || text.contains("errsecitemnotfound")
}

/// Keychain-based secure storage for macOS.
///
/// Entries are generic passwords keyed by `(service, account)`.
pub struct KeychainStorage {
    service_name: String,
}

impl KeychainStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    fn search(&self, key: &str) -> StorageResult<Option<String>> {
        let mut options = ItemSearchOptions::new();
        options
            .class(ItemClass::generic_password())
            .service(&self.service_name)
            .account(key)
            .limit(Limit::Max(1))
            .load_data(true);

        let results = match options.search() {
            Ok(results) => results,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => {
                return Err(StorageError::Platform(format!(
                    "Keychain search failed: {}",
                    e
                )))
            }
        };

        match results.into_iter().next() {
            Some(SearchResult::Data(data)) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string())),
            _ => Ok(None),
        }
    }
}

impl SecureStorage for KeychainStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Storing keychain item");

        // Replace semantics: drop any existing entry first.
        let _ = delete_generic_password(&self.service_name, key);

        set_generic_password(&self.service_name, key, value.as_bytes())
            .map_err(|e| StorageError::Platform(format!("Keychain write failed: {}", e)))
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Reading keychain item");
        self.search(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting keychain item");

        match delete_generic_password(&self.service_name, key) {
            Ok(()) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::Platform(format!(
                "Keychain delete failed: {}",
                e
            ))),
        }
    }
}
