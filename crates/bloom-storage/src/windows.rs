//! Windows Credential Vault implementation.

use crate::{SecureStorage, StorageError, StorageResult};
use tracing::debug;
use windows::{
    core::HSTRING,
    Security::Credentials::{PasswordCredential, PasswordVault},
};

/// HRESULT for ERROR_NOT_FOUND, returned by `Retrieve` for absent entries.
const ERROR_NOT_FOUND: u32 = 0x80070490;

fn is_not_found(e: &windows::core::Error) -> bool {
    e.code().0 as u32 == ERROR_NOT_FOUND
}

/// Credential Vault based secure storage for Windows.
///
/// Entries are vault credentials with the service name as the resource and
/// the storage key as the user name.
pub struct CredentialVaultStorage {
    resource_name: String,
}

impl CredentialVaultStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        // Fail fast if the vault is unavailable.
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Credential Vault unavailable: {}", e))
        })?;

        Ok(Self {
            resource_name: service_name.to_string(),
        })
    }

    fn vault(&self) -> StorageResult<PasswordVault> {
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Credential Vault unavailable: {}", e))
        })
    }

    /// Look up the credential for `key`, mapping "not found" to `None`.
    fn retrieve(&self, vault: &PasswordVault, key: &str) -> StorageResult<Option<PasswordCredential>> {
        let resource = HSTRING::from(&self.resource_name);
        let user_name = HSTRING::from(key);

        match vault.Retrieve(&resource, &user_name) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(StorageError::Platform(format!(
                "Credential lookup failed: {}",
                e
            ))),
        }
    }
}

impl SecureStorage for CredentialVaultStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(resource = %self.resource_name, key = %key, "Storing credential");

        let vault = self.vault()?;

        // Replace semantics: drop any existing entry first.
        if let Some(existing) = self.retrieve(&vault, key)? {
            let _ = vault.Remove(&existing);
        }

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(&self.resource_name),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| StorageError::Platform(format!("Credential creation failed: {}", e)))?;

        vault
            .Add(&credential)
            .map_err(|e| StorageError::Platform(format!("Credential write failed: {}", e)))
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(resource = %self.resource_name, key = %key, "Reading credential");

        let vault = self.vault()?;
        let credential = match self.retrieve(&vault, key)? {
            Some(credential) => credential,
            None => return Ok(None),
        };

        // Password material is lazy; RetrievePassword populates it.
        credential
            .RetrievePassword()
            .map_err(|e| StorageError::Platform(format!("Password retrieval failed: {}", e)))?;
        let password = credential
            .Password()
            .map_err(|e| StorageError::Platform(format!("Password read failed: {}", e)))?;

        Ok(Some(password.to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "Deleting credential");

        let vault = self.vault()?;
        match self.retrieve(&vault, key)? {
            Some(credential) => {
                vault
                    .Remove(&credential)
                    .map_err(|e| StorageError::Platform(format!("Credential delete failed: {}", e)))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
