//! Metadata Storage Layer Abstraction
//!
//! Associates each content key with the content type declared on first
//! upload and the time of that upload. Records are written once and never
//! updated, so the only write is a conditional insert.

pub mod config;
pub mod mock_store;
pub mod sqlite_store;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
pub use crate::storage::PutOutcome;

/// Metadata associated with a stored object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    /// MIME type declared when the content was first uploaded
    pub content_type: String,
    /// Time of the first successful upload
    pub upload_time: DateTime<Utc>,
}

impl MediaRecord {
    pub fn new(content_type: impl Into<String>, upload_time: DateTime<Utc>) -> Self {
        Self {
            content_type: content_type.into(),
            upload_time,
        }
    }

    /// Record stamped with the current time
    pub fn now(content_type: impl Into<String>) -> Self {
        Self::new(content_type, Utc::now())
    }
}

/// Trait defining the metadata storage interface
pub trait MetadataStorage: Send + Sync {
    /// Record metadata for `key` unless a record already exists.
    ///
    /// Must be atomic against concurrent writers of the same key.
    fn put_metadata_if_absent(&self, key: &str, record: &MediaRecord) -> Result<PutOutcome, StoreError>;

    /// Retrieve metadata for `key`
    fn get_metadata(&self, key: &str) -> Result<MediaRecord, StoreError>;

    /// List all recorded keys
    fn list_objects(&self) -> Result<Vec<String>, StoreError>;
}
