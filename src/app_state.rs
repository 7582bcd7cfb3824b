//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::metadata::{mock_store::MockMetadataStore, MetadataStorage};
use crate::service::media_service::MediaService;
use crate::storage::{mock_store::MockObjectStore, ObjectStore};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub media_service: Arc<MediaService>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        info!("Initializing application state with configuration");

        info!("Using {:?} object storage backend", config.storage.backend);
        let objects = config.storage.create_store()?;

        info!(
            "Using {:?} metadata backend, partition '{}'",
            config.metadata.backend, config.metadata.partition
        );
        let metadata = config.metadata.create_store()?;

        info!("Application state initialized successfully");
        Ok(Self::with_backends(objects, metadata, config))
    }

    /// Create application state around already constructed backends
    pub fn with_backends(objects: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStorage>, config: AppConfig) -> Self {
        Self {
            media_service: Arc::new(MediaService::new(objects, metadata)),
            config,
        }
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        Self::with_backends(
            Arc::new(MockObjectStore::new()),
            Arc::new(MockMetadataStore::new()),
            AppConfig::for_testing(),
        )
    }
}
