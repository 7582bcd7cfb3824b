//! Mock implementation of ObjectStore for testing

use crate::error::StoreError;
use crate::storage::{ObjectStore, PutOutcome};
use bytes::Bytes;
use log::info;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Calls received by a mock store, per operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub exists: usize,
    pub put: usize,
    pub get: usize,
    pub list: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.exists + self.put + self.get + self.list
    }
}

#[derive(Default)]
struct Counters {
    exists: AtomicUsize,
    put: AtomicUsize,
    get: AtomicUsize,
    list: AtomicUsize,
}

/// In-memory object store: key -> (content, content type)
pub struct MockObjectStore {
    data: Arc<Mutex<HashMap<String, (Bytes, String)>>>,
    counters: Counters,
    unavailable: AtomicBool,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            counters: Counters::default(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            exists: self.counters.exists.load(Ordering::SeqCst),
            put: self.counters.put.load(Ordering::SeqCst),
            get: self.counters.get.load(Ordering::SeqCst),
            list: self.counters.list.load(Ordering::SeqCst),
        }
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Content type recorded with an object
    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.data.lock().ok()?.get(key).map(|(_, ct)| ct.clone())
    }

    /// Drop an object behind the service's back, leaving any metadata dangling
    pub fn remove(&self, key: &str) -> bool {
        self.data
            .lock()
            .map(|mut d| d.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Clear all data from the store
    pub fn clear(&self) {
        if let Ok(mut data) = self.data.lock() {
            data.clear();
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, (Bytes, String)>>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock object store is offline".to_string()));
        }
        self.data
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MockObjectStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.counters.exists.fetch_add(1, Ordering::SeqCst);
        Ok(self.guard()?.contains_key(key))
    }

    fn put_if_absent(&self, key: &str, data: &[u8], content_type: &str) -> Result<PutOutcome, StoreError> {
        self.counters.put.fetch_add(1, Ordering::SeqCst);
        let mut store = self.guard()?;
        if store.contains_key(key) {
            return Ok(PutOutcome::AlreadyExists);
        }
        store.insert(
            key.to_string(),
            (Bytes::copy_from_slice(data), content_type.to_string()),
        );
        info!("Mock: Stored {} bytes under key {}", data.len(), key);
        Ok(PutOutcome::Created)
    }

    fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        self.guard()?
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StoreError::NotFound(format!("No object stored for key: {}", key)))
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        let mut keys: Vec<String> = self.guard()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
