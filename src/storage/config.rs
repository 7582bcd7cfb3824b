//! Configuration for object storage backends

use crate::error::StoreError;
use crate::storage::{local_store::LocalFsObjectStore, mock_store::MockObjectStore, ObjectStore};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Available object storage backends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum StorageBackend {
    #[default]
    LocalFs,
    Mock,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "localfs" | "local" | "fs" => Ok(StorageBackend::LocalFs),
            "mock" => Ok(StorageBackend::Mock),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type
    pub backend: StorageBackend,
    /// Directory holding the stored objects
    pub base_path: String,
    /// Directory for in-flight writes, same filesystem as `base_path`
    pub temp_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            base_path: "./data/objects".to_string(),
            temp_path: "./data/tmp".to_string(),
        }
    }
}

impl StorageConfig {
    /// Override the backend from `STORAGE_BACKEND` when it is set
    pub fn apply_env(&mut self) {
        if let Ok(backend_str) = env::var("STORAGE_BACKEND") {
            match backend_str.parse::<StorageBackend>() {
                Ok(backend) => {
                    info!("Using storage backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => {
                    warn!("Invalid storage backend in environment: {}. Keeping {:?}.", e, self.backend);
                }
            }
        }
    }

    /// Create a storage instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn ObjectStore>, StoreError> {
        match self.backend {
            StorageBackend::LocalFs => {
                info!("Creating local filesystem object store at {}", self.base_path);
                Ok(Arc::new(LocalFsObjectStore::new(self)?))
            }
            StorageBackend::Mock => {
                info!("Creating mock object store");
                Ok(Arc::new(MockObjectStore::new()))
            }
        }
    }
}
