//! Durable storage for the single active bearer token.
//!
//! Every store keeps the token in memory and mirrors it to a durable
//! backend. A backend that cannot be read or written only costs
//! durability: the failure is logged and the in-memory value stays
//! authoritative, so `get_token`/`set_token` never fail.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token file name in cache directory
const TOKEN_FILE: &str = "token.json";

const KEYRING_SERVICE: &str = "supermall";
const KEYRING_USER: &str = "access_token";

/// Holder of zero or one bearer credential.
///
/// Implementations must be cheap to read: the request client calls
/// `get_token` once per request.
pub trait TokenStore: Send + Sync {
    fn get_token(&self) -> Option<String>;

    /// Replace the held token, or clear it with `None`. Last write wins.
    fn set_token(&self, token: Option<String>);
}

/// Token store without persistence.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    saved_at: DateTime<Utc>,
}

/// Token store persisted as JSON in the cache directory.
pub struct FileTokenStore {
    path: PathBuf,
    token: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open the store in `cache_dir`, loading any previously saved token.
    pub fn open(cache_dir: impl AsRef<Path>) -> Self {
        let path = cache_dir.as_ref().join(TOKEN_FILE);
        let token = match Self::load(&path) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Ignoring unreadable token file");
                None
            }
        };
        debug!(path = %path.display(), has_token = token.is_some(), "Token store opened");
        Self {
            path,
            token: RwLock::new(token),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).context("Failed to read token file")?;
        let stored: StoredToken =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(stored.access_token))
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredToken {
            access_token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: Option<String>) {
        let mut slot = self.token.write();
        let result = match token.as_deref() {
            Some(t) => self.save(t),
            None => self.remove(),
        };
        if let Err(e) = result {
            warn!(error = %e, "Token not persisted, keeping it in memory only");
        }
        *slot = token;
    }
}

/// Token store persisted in the OS keychain.
pub struct KeyringTokenStore {
    service: String,
    user: String,
    token: RwLock<Option<String>>,
}

impl KeyringTokenStore {
    /// Open the default keychain entry, loading any saved token.
    pub fn open() -> Self {
        Self::with_names(KEYRING_SERVICE, KEYRING_USER)
    }

    /// Open a keychain entry with custom names.
    pub fn with_names(service: impl Into<String>, user: impl Into<String>) -> Self {
        let store = Self {
            service: service.into(),
            user: user.into(),
            token: RwLock::new(None),
        };
        let loaded = match store.entry().and_then(|entry| match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, service = %store.service, "Keychain unavailable, token kept in memory only");
                None
            }
        };
        *store.token.write() = loaded;
        store
    }

    fn entry(&self) -> keyring::Result<Entry> {
        Entry::new(&self.service, &self.user)
    }

    fn persist(&self, token: Option<&str>) -> keyring::Result<()> {
        let entry = self.entry()?;
        match token {
            Some(t) => entry.set_password(t),
            None => match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e),
            },
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn get_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: Option<String>) {
        let mut slot = self.token.write();
        if let Err(e) = self.persist(token.as_deref()) {
            warn!(error = %e, service = %self.service, "Token not saved to keychain, keeping it in memory only");
        }
        *slot = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get_token(), None);

        store.set_token(Some("abc".to_string()));
        assert_eq!(store.get_token().as_deref(), Some("abc"));

        store.set_token(Some("def".to_string()));
        assert_eq!(store.get_token().as_deref(), Some("def"));

        store.set_token(None);
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn test_memory_accepts_any_string() {
        let store = MemoryTokenStore::new();
        store.set_token(Some(String::new()));
        assert_eq!(store.get_token().as_deref(), Some(""));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileTokenStore::open(dir.path());
        assert_eq!(store.get_token(), None);
        store.set_token(Some("tok-123".to_string()));
        assert!(store.path().exists());

        let reopened = FileTokenStore::open(dir.path());
        assert_eq!(reopened.get_token().as_deref(), Some("tok-123"));

        reopened.set_token(None);
        assert!(!reopened.path().exists());
        assert_eq!(FileTokenStore::open(dir.path()).get_token(), None);
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "not json").unwrap();

        let store = FileTokenStore::open(dir.path());
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn test_file_store_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be makes every write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let store = FileTokenStore::open(blocker.join("nested"));
        store.set_token(Some("kept".to_string()));
        assert_eq!(store.get_token().as_deref(), Some("kept"));
    }

    #[test]
    #[ignore = "requires system keyring"]
    fn test_keyring_round_trip() {
        let store = KeyringTokenStore::with_names("supermall-test", "test-token");
        store.set_token(Some("secret".to_string()));

        let reopened = KeyringTokenStore::with_names("supermall-test", "test-token");
        assert_eq!(reopened.get_token().as_deref(), Some("secret"));

        reopened.set_token(None);
        assert_eq!(reopened.get_token(), None);
    }
}
