//! Mock implementation of MetadataStorage trait for testing

use crate::error::StoreError;
use crate::metadata::{MediaRecord, MetadataStorage, PutOutcome};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock implementation of MetadataStorage for testing
pub struct MockMetadataStore {
    data: Arc<Mutex<HashMap<String, MediaRecord>>>,
    put_calls: AtomicUsize,
    get_calls: AtomicUsize,
    unavailable: AtomicBool,
    fail_puts: AtomicBool,
}

impl MockMetadataStore {
    /// Create a new mock metadata store
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            put_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            fail_puts: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only writes, leaving reads working
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Get the number of records in the store
    pub fn object_count(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Insert a record directly, bypassing the conditional write
    pub fn insert_raw(&self, key: &str, record: MediaRecord) {
        if let Ok(mut data) = self.data.lock() {
            data.insert(key.to_string(), record);
        }
    }

    /// Clear all data from the store (useful for test cleanup)
    pub fn clear(&self) {
        if let Ok(mut data) = self.data.lock() {
            data.clear();
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, MediaRecord>>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock metadata store is offline".to_string()));
        }
        self.data
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl Default for MockMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStorage for MockMetadataStore {
    fn put_metadata_if_absent(&self, key: &str, record: &MediaRecord) -> Result<PutOutcome, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock metadata write rejected".to_string()));
        }
        let mut data = self.guard()?;
        if data.contains_key(key) {
            return Ok(PutOutcome::AlreadyExists);
        }
        data.insert(key.to_string(), record.clone());
        Ok(PutOutcome::Created)
    }

    fn get_metadata(&self, key: &str) -> Result<MediaRecord, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.guard()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("No metadata for key: {}", key)))
    }

    fn list_objects(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.guard()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
