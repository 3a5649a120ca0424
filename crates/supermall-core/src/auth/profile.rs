//! Profile record persistence.
//!
//! The identity bridge reads and writes profile documents through the
//! [`ProfileStore`] trait. `FileProfileStore` keeps one JSON document per
//! identity under the cache directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use super::session::{ProfileRecord, ProfileUpdate};

/// Subdirectory of the cache directory holding profile documents
const PROFILES_DIR: &str = "profiles";

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Profile storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile document is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid profile id: {0}")]
    InvalidId(String),

    #[error("Profile backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<ProfileRecord>, ProfileError>;

    /// Replace the whole record.
    async fn set_profile(&self, uid: &str, record: &ProfileRecord) -> Result<(), ProfileError>;

    /// Merge `update` into the stored record, creating it when missing.
    async fn merge_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileRecord, ProfileError>;
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    records: RwLock<HashMap<String, ProfileRecord>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, e.g. one left by an earlier session.
    pub fn insert(&self, uid: impl Into<String>, record: ProfileRecord) {
        self.records.write().insert(uid.into(), record);
    }

    pub fn get(&self, uid: &str) -> Option<ProfileRecord> {
        self.records.read().get(uid).cloned()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<ProfileRecord>, ProfileError> {
        Ok(self.get(uid))
    }

    async fn set_profile(&self, uid: &str, record: &ProfileRecord) -> Result<(), ProfileError> {
        self.insert(uid, record.clone());
        Ok(())
    }

    async fn merge_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileRecord, ProfileError> {
        let mut records = self.records.write();
        let record = records.entry(uid.to_string()).or_default();
        update.apply(record);
        Ok(record.clone())
    }
}

pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let dir = cache_dir.as_ref().join(PROFILES_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn profile_path(&self, uid: &str) -> Result<PathBuf, ProfileError> {
        let valid = !uid.is_empty()
            && uid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ProfileError::InvalidId(uid.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", uid)))
    }

    fn load(&self, uid: &str) -> Result<Option<ProfileRecord>, ProfileError> {
        let path = self.profile_path(uid)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, uid: &str, record: &ProfileRecord) -> Result<(), ProfileError> {
        let path = self.profile_path(uid)?;
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, contents)?;
        debug!(uid = uid, "Profile saved");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<ProfileRecord>, ProfileError> {
        self.load(uid)
    }

    async fn set_profile(&self, uid: &str, record: &ProfileRecord) -> Result<(), ProfileError> {
        self.save(uid, record)
    }

    async fn merge_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileRecord, ProfileError> {
        let mut record = self.load(uid)?.unwrap_or_default();
        update.apply(&mut record);
        self.save(uid, &record)?;
        Ok(record)
    }
}
