//! Media service: validate, hash, dedup and store on upload; look up and fetch on download

use crate::error::{MediaError, StoreError};
use crate::media::{content_key, is_content_key, validate, MediaKey, MediaType};
use crate::metadata::{MediaRecord, MetadataStorage};
use crate::storage::ObjectStore;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

const MDC_KEY: &str = "media_key";

/// Keeps the current media key in the logging MDC for the lifetime of the guard
struct MdcGuard;

impl MdcGuard {
    fn set(key: &str) -> Self {
        log_mdc::insert(MDC_KEY, key);
        MdcGuard
    }
}

impl Drop for MdcGuard {
    fn drop(&mut self) {
        log_mdc::remove(MDC_KEY);
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub key: MediaKey,
    /// False when the content was already stored (dedup hit or lost race)
    pub created: bool,
}

/// Content and metadata returned by a download
#[derive(Debug, Clone)]
pub struct MediaContent {
    pub key: MediaKey,
    pub content_type: String,
    pub upload_time: DateTime<Utc>,
    pub data: Bytes,
}

/// Object present in the object store with no metadata record
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanedObject {
    pub key: MediaKey,
    /// Type suggested by the content's signature, if any
    pub sniffed_type: Option<MediaType>,
}

/// Findings of one reconciliation pass over both stores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub checked_objects: usize,
    pub checked_records: usize,
    /// Content stored, metadata missing
    pub orphaned_content: Vec<OrphanedObject>,
    /// Metadata recorded, content missing
    pub dangling_metadata: Vec<MediaKey>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_content.is_empty() && self.dangling_metadata.is_empty()
    }
}

/// Orchestrates the content validator, hasher and both stores
pub struct MediaService {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStorage>,
}

impl MediaService {
    /// Create a new media service with injected backends
    pub fn new(objects: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStorage>) -> Self {
        Self { objects, metadata }
    }

    /// Store `data` under its content key, once.
    ///
    /// Validation happens before any store is touched. Content already
    /// present is not written again, and neither is its metadata.
    pub fn upload(&self, declared_type: &str, data: &[u8]) -> Result<UploadReceipt, MediaError> {
        if data.is_empty() {
            warn!("Rejected empty upload");
            return Err(MediaError::InvalidInput);
        }

        let key = content_key(data);
        let _mdc = MdcGuard::set(&key);

        if !validate(declared_type, data) {
            warn!(
                "Rejected upload: declared type '{}' does not match content ({} bytes)",
                declared_type,
                data.len()
            );
            return Err(MediaError::InvalidMediaType);
        }

        if self.objects.exists(&key).map_err(|e| backend_failure("exists check", &key, e))? {
            info!("Content already stored for key {}, skipping writes", key);
            return Ok(UploadReceipt { key, created: false });
        }

        let content_outcome = self
            .objects
            .put_if_absent(&key, data, declared_type)
            .map_err(|e| backend_failure("content write", &key, e))?;
        debug!("Content write for key {}: {:?}", key, content_outcome);

        let record = MediaRecord::now(declared_type);
        match self.metadata.put_metadata_if_absent(&key, &record) {
            Ok(outcome) => debug!("Metadata write for key {}: {:?}", key, outcome),
            Err(e) => {
                error!(
                    "Inconsistent state: content stored for key {} but metadata write failed: {}",
                    key, e
                );
                return Err(e.into());
            }
        }

        info!(
            "Stored {} bytes as {} under key {}",
            data.len(),
            declared_type,
            key
        );
        Ok(UploadReceipt {
            key,
            created: content_outcome.is_created(),
        })
    }

    /// Metadata for `key`, without fetching content
    pub fn metadata(&self, key: &str) -> Result<MediaRecord, MediaError> {
        if !is_content_key(key) {
            debug!("Lookup for malformed key '{}'", key);
            return Err(MediaError::NotFound);
        }
        let _mdc = MdcGuard::set(key);

        match self.metadata.get_metadata(key) {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound(_)) => {
                self.report_if_orphaned(key);
                Err(MediaError::NotFound)
            }
            Err(e) => Err(backend_failure("metadata lookup", key, e)),
        }
    }

    /// Fetch content and its recorded type
    pub fn download(&self, key: &str) -> Result<MediaContent, MediaError> {
        let record = self.metadata(key)?;
        let _mdc = MdcGuard::set(key);

        let data = match self.objects.get(key) {
            Ok(data) => data,
            Err(StoreError::NotFound(_)) => {
                error!(
                    "Inconsistent state: metadata present but content missing for key {}",
                    key
                );
                return Err(MediaError::NotFound);
            }
            Err(e) => return Err(backend_failure("content fetch", key, e)),
        };

        debug!("Serving {} bytes of {} for key {}", data.len(), record.content_type, key);
        Ok(MediaContent {
            key: key.to_string(),
            content_type: record.content_type,
            upload_time: record.upload_time,
            data,
        })
    }

    /// Compare both stores and report keys present in only one of them.
    ///
    /// Nothing is repaired; findings are logged for an operator.
    pub fn audit(&self) -> Result<AuditReport, MediaError> {
        let object_keys: BTreeSet<String> = self
            .objects
            .list_keys()
            .map_err(|e| backend_failure("object listing", "*", e))?
            .into_iter()
            .collect();
        let record_keys: BTreeSet<String> = self
            .metadata
            .list_objects()
            .map_err(|e| backend_failure("metadata listing", "*", e))?
            .into_iter()
            .collect();

        let mut report = AuditReport {
            checked_objects: object_keys.len(),
            checked_records: record_keys.len(),
            ..AuditReport::default()
        };

        for key in object_keys.difference(&record_keys) {
            let sniffed_type = match self.objects.get(key) {
                Ok(data) => MediaType::sniff(&data),
                Err(e) => {
                    warn!("Could not read orphaned object {}: {}", key, e);
                    None
                }
            };
            error!(
                "Audit: content without metadata for key {} (looks like {})",
                key,
                sniffed_type.map(|t| t.mime()).unwrap_or("unknown")
            );
            report.orphaned_content.push(OrphanedObject {
                key: key.clone(),
                sniffed_type,
            });
        }

        for key in record_keys.difference(&object_keys) {
            error!("Audit: metadata without content for key {}", key);
            report.dangling_metadata.push(key.clone());
        }

        info!(
            "Audit checked {} objects and {} records: {} orphaned, {} dangling",
            report.checked_objects,
            report.checked_records,
            report.orphaned_content.len(),
            report.dangling_metadata.len()
        );
        Ok(report)
    }

    fn report_if_orphaned(&self, key: &str) {
        match self.objects.exists(key) {
            Ok(true) => error!(
                "Inconsistent state: content stored but metadata missing for key {}",
                key
            ),
            Ok(false) => debug!("No media stored for key {}", key),
            Err(e) => debug!("Orphan probe failed for key {}: {}", key, e),
        }
    }
}

fn backend_failure(operation: &str, key: &str, e: StoreError) -> MediaError {
    error!("Backend failure during {} for key {}: {}", operation, key, e);
    match e {
        StoreError::NotFound(msg) => MediaError::BackendUnavailable(msg),
        StoreError::Unavailable(msg) => MediaError::BackendUnavailable(msg),
    }
}
