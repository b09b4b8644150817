//! File-backed token storage.
//!
//! Mirrors the web runtime's durable local storage as a JSON map on
//! disk: the vendor SDK's persistence layer reads these keys when a
//! fresh instance is constructed. Writes are whole-file
//! write-then-rename so a crashed write never corrupts the map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cadenza_application::ports::{StorageError, TokenStorage};
use tokio::sync::Mutex;

/// File name of the storage map inside the application data dir.
const STORAGE_FILE: &str = "web-storage.json";

/// JSON-file key/value storage.
pub struct FileTokenStorage {
    path: PathBuf,
    // Serializes whole-file rewrites; the puts themselves are
    // idempotent and order-independent.
    write_lock: Mutex<()>,
}

impl FileTokenStorage {
    /// Creates a storage over an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a storage under the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if no data directory is available.
    pub fn in_data_dir(app_name: &str) -> Result<Self, StorageError> {
        let base = dirs::data_dir()
            .ok_or_else(|| StorageError::Io("no platform data directory".to_string()))?;
        Ok(Self::new(base.join(app_name).join(STORAGE_FILE)))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupted(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn store(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let bytes =
            serde_json::to_vec_pretty(map).map_err(|e| StorageError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await.unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.store(&map).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load().await?.get(key).cloned())
    }
}
