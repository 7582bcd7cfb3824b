//! Local filesystem object storage implementation
//!
//! Objects are stored one file per key under `base_path/<first two hex chars>/<key>`.
//! Writes go to a temp file first and are published with a hard link, which
//! fails instead of overwriting when the key is already present. `temp_path`
//! must therefore live on the same filesystem as `base_path`.

use crate::error::StoreError;
use crate::media::is_content_key;
use crate::storage::config::StorageConfig;
use crate::storage::{ObjectStore, PutOutcome};
use bytes::Bytes;
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Local filesystem object store
pub struct LocalFsObjectStore {
    storage_path: PathBuf,
    temp_path: PathBuf,
    temp_counter: AtomicU64,
}

impl LocalFsObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        Self::with_paths(&config.base_path, &config.temp_path)
    }

    pub fn with_paths(base_path: impl AsRef<Path>, temp_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_path = base_path.as_ref().to_path_buf();
        let temp_path = temp_path.as_ref().to_path_buf();

        fs::create_dir_all(&storage_path)?;
        fs::create_dir_all(&temp_path)?;
        info!(
            "Using local storage directory: {}, temp directory: {}",
            storage_path.display(),
            temp_path.display()
        );

        Ok(Self {
            storage_path,
            temp_path,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Get the file path for a key, sharded by its first two characters
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        // Keys become file names, so anything else could escape the store
        if !is_content_key(key) {
            return Err(StoreError::NotFound(format!("Not a content key: {}", key)));
        }
        Ok(self.storage_path.join(&key[..2]).join(key))
    }

    fn temp_file_path(&self, key: &str) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.temp_path
            .join(format!("{}.{}.{}.part", key, std::process::id(), n))
    }

    fn write_temp(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(data)?;
        file.sync_all()
    }
}

impl ObjectStore for LocalFsObjectStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = match self.object_path(key) {
            Ok(path) => path,
            Err(_) => return Ok(false),
        };
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn put_if_absent(&self, key: &str, data: &[u8], content_type: &str) -> Result<PutOutcome, StoreError> {
        let final_path = self.object_path(key)?;
        if let Some(shard) = final_path.parent() {
            fs::create_dir_all(shard).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let temp = self.temp_file_path(key);
        if let Err(e) = self.write_temp(&temp, data) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::Unavailable(e.to_string()));
        }

        let outcome = match fs::hard_link(&temp, &final_path) {
            Ok(()) => Ok(PutOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(PutOutcome::AlreadyExists),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        };

        if let Err(e) = fs::remove_file(&temp) {
            warn!("Failed to remove temp file {}: {}", temp.display(), e);
        }

        if let Ok(result) = &outcome {
            debug!(
                "Local put for key {} ({}, {} bytes): {:?}",
                key,
                content_type,
                data.len(),
                result
            );
        }
        outcome
    }

    fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(key)?;
        let data = fs::read(&path)?;
        debug!("Read {} bytes for key {}", data.len(), key);
        Ok(Bytes::from(data))
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for shard in fs::read_dir(&self.storage_path)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                if let Some(name) = entry.file_name().to_str() {
                    if is_content_key(name) {
                        keys.push(name.to_string());
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
