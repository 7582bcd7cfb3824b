//! Object Storage Layer Abstraction
//!
//! Content bytes live here, keyed by their content key. Backends only need
//! to offer an atomic create-if-absent write, so the same payload uploaded
//! concurrently is stored exactly once.

pub mod config;
pub mod local_store;
pub mod mock_store;


use bytes::Bytes;

use crate::error::StoreError;

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// This call wrote the value
    Created,
    /// A value was already present under the key; nothing was written
    AlreadyExists,
}

impl PutOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PutOutcome::Created)
    }
}

/// Trait defining the content storage interface
pub trait ObjectStore: Send + Sync {
    /// Check whether content is stored under `key`
    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Store `data` under `key` unless something is already there.
    ///
    /// Must be atomic against concurrent writers of the same key.
    fn put_if_absent(&self, key: &str, data: &[u8], content_type: &str) -> Result<PutOutcome, StoreError>;

    /// Fetch the content stored under `key`
    fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// List every stored key (used by the audit pass)
    fn list_keys(&self) -> Result<Vec<String>, StoreError>;
}
