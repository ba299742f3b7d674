pub mod ssh;

pub use ssh::{build_credentials, credentials_for, AuthPolicy, SshCredentials};

use gitsyncr_core::error::GitsyncrError;

/// Trait for secret storage backends.
pub trait CredentialStore: Send + Sync {
    /// Store a secret under the given key.
    fn store(&self, key: &str, secret: &str) -> Result<(), GitsyncrError>;

    /// Retrieve a secret by key.
    fn get(&self, key: &str) -> Result<Option<String>, GitsyncrError>;

    /// Delete a stored secret.
    fn delete(&self, key: &str) -> Result<(), GitsyncrError>;
}

/// Store key for the passphrase of the SSH key at `key_path`.
pub fn passphrase_key(key_path: &std::path::Path) -> String {
    format!("ssh-passphrase:{}", key_path.display())
}

/// OS keychain-backed store using the `keyring` crate.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "gitsyncr".to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, GitsyncrError> {
        keyring::Entry::new(&self.service, key).map_err(|e| GitsyncrError::CredentialError {
            message: e.to_string(),
        })
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, secret: &str) -> Result<(), GitsyncrError> {
        self.entry(key)?
            .set_password(secret)
            .map_err(|e| GitsyncrError::CredentialError {
                message: e.to_string(),
            })
    }

    fn get(&self, key: &str) -> Result<Option<String>, GitsyncrError> {
        match self.entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(GitsyncrError::CredentialError {
                message: e.to_string(),
            }),
        }
    }

    fn delete(&self, key: &str) -> Result<(), GitsyncrError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(GitsyncrError::CredentialError {
                message: e.to_string(),
            }),
        }
    }
}

/// In-memory store for testing and for runs without a keychain.
pub struct MemoryStore {
    store: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            store: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, std::collections::HashMap<String, String>>, GitsyncrError>
    {
        self.store.lock().map_err(|_| GitsyncrError::CredentialError {
            message: "memory store poisoned".into(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, secret: &str) -> Result<(), GitsyncrError> {
        self.lock()?.insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, GitsyncrError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), GitsyncrError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("test-key").unwrap(), None);
        store.store("test-key", "hunter2").unwrap();
        assert_eq!(store.get("test-key").unwrap(), Some("hunter2".to_string()));
        store.delete("test-key").unwrap();
        assert_eq!(store.get("test-key").unwrap(), None);
    }

    #[test]
    fn test_memory_store_delete_nonexistent() {
        let store = MemoryStore::new();
        store.delete("no-such-key").unwrap();
    }

    #[test]
    fn test_passphrase_key_uses_path() {
        let key = passphrase_key(std::path::Path::new("/home/me/.ssh/id_rsa"));
        assert_eq!(key, "ssh-passphrase:/home/me/.ssh/id_rsa");
    }
}
