use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

use super::Credential;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

const SERVICE_NAME: &str = "smart-money";

/// Keychain account the credential is stored under
const KEYRING_ACCOUNT: &str = "session";

/// Where the bearer token lives between runs.
///
/// Only the session manager writes through this trait; everything else
/// reads credentials from the manager's snapshot.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Keeps the credential for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>> {
        let slot = self.slot.lock().map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

/// Persists the credential as JSON in the cache directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credential>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let credential: Credential =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        let contents = serde_json::to_string_pretty(credential)?;
        let path = self.path();
        std::fs::write(&path, contents).context("Failed to write session file")?;
        restrict_permissions(&path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to restrict session file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

/// Stores the credential in the OS keychain.
pub struct KeyringStore {
    account: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self {
            account: KEYRING_ACCOUNT.to_string(),
        }
    }
}

impl KeyringStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Result<Option<Credential>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let credential: Credential = serde_json::from_str(&json)
                    .context("Failed to parse credential from keychain")?;
                Ok(Some(credential))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credential from keychain"),
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string(credential)?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store credential in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample() -> Credential {
        Credential::issue("token-abc".to_string(), Utc::now(), Duration::minutes(120))
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap().map(|c| c.token), Some("token-abc".to_string()));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.load().unwrap().is_none());
        // Clearing a store that was never written is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let cred = sample();
        FileStore::new(dir.path().to_path_buf()).save(&cred).unwrap();

        let reopened = FileStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.load().unwrap(), Some(cred));

        reopened.clear().unwrap();
        assert!(!reopened.path().exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.load().is_err());
    }
}
