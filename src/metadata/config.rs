//! Configuration for metadata storage backends

use crate::error::StoreError;
use crate::metadata::{mock_store::MockMetadataStore, sqlite_store::SQLiteMetadataStore, MetadataStorage};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Available metadata storage backends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum MetadataBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for MetadataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(MetadataBackend::SQLite),
            "mock" => Ok(MetadataBackend::Mock),
            _ => Err(format!("Unknown metadata backend: {}", s)),
        }
    }
}

/// Metadata backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Metadata backend type
    pub backend: MetadataBackend,
    /// Database file path
    pub db_path: String,
    /// Enable WAL mode
    pub wal_mode: bool,
    /// Namespace all records are filed under
    pub partition: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::default(),
            db_path: "./data/metadata.sqlite".to_string(),
            wal_mode: true,
            partition: "media".to_string(),
        }
    }
}

impl MetadataConfig {
    /// Override the backend from `METADATA_BACKEND` when it is set
    pub fn apply_env(&mut self) {
        if let Ok(backend_str) = env::var("METADATA_BACKEND") {
            match backend_str.parse::<MetadataBackend>() {
                Ok(backend) => {
                    info!("Using metadata backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => {
                    warn!("Invalid metadata backend in environment: {}. Keeping {:?}.", e, self.backend);
                }
            }
        }
    }

    /// Create a metadata storage instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn MetadataStorage>, StoreError> {
        match self.backend {
            MetadataBackend::SQLite => {
                info!("Creating SQLite metadata store");
                Ok(Arc::new(SQLiteMetadataStore::new(self)?))
            }
            MetadataBackend::Mock => {
                info!("Creating Mock metadata store");
                Ok(Arc::new(MockMetadataStore::new()))
            }
        }
    }
}
