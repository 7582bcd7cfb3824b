//! SQLite implementation of MetadataStorage trait

use crate::error::StoreError;
use crate::metadata::config::MetadataConfig;
use crate::metadata::{MediaRecord, MetadataStorage, PutOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite implementation of MetadataStorage
///
/// All rows live in one partition, so the store behaves as a single
/// namespace keyed by content key.
pub struct SQLiteMetadataStore {
    conn: Mutex<Connection>,
    partition: String,
}

impl SQLiteMetadataStore {
    /// Open (or create) the database described by `config`
    pub fn new(config: &MetadataConfig) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.db_path)?;
        if config.wal_mode {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            info!("SQLite journal mode: {}", mode);
        }
        info!("Opened metadata database at {}", config.db_path);
        Self::from_connection(conn, &config.partition)
    }

    /// In-memory database, for tests and throwaway runs
    pub fn in_memory(partition: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, partition)
    }

    fn from_connection(conn: Connection, partition: &str) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS media (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                content_type TEXT NOT NULL,
                upload_time TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            partition: partition.to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Metadata connection poisoned: {}", e)))
    }
}

fn parse_upload_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Unavailable(format!("Corrupt upload_time '{}': {}", raw, e)))
}

impl MetadataStorage for SQLiteMetadataStore {
    fn put_metadata_if_absent(&self, key: &str, record: &MediaRecord) -> Result<PutOutcome, StoreError> {
        let upload_time = record.upload_time.to_rfc3339_opts(SecondsFormat::Micros, true);
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO media (namespace, key, content_type, upload_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![self.partition, key, record.content_type, upload_time],
        )?;

        if changed == 0 {
            debug!("Metadata already present for key: {}", key);
            Ok(PutOutcome::AlreadyExists)
        } else {
            debug!("Recorded metadata for key: {} ({})", key, record.content_type);
            Ok(PutOutcome::Created)
        }
    }

    fn get_metadata(&self, key: &str) -> Result<MediaRecord, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT content_type, upload_time FROM media WHERE namespace = ?1 AND key = ?2",
                params![self.partition, key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((content_type, raw_time)) => Ok(MediaRecord {
                content_type,
                upload_time: parse_upload_time(&raw_time)?,
            }),
            None => {
                warn!("No metadata found for key: {}", key);
                Err(StoreError::NotFound(format!("No metadata for key: {}", key)))
            }
        }
    }

    fn list_objects(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM media WHERE namespace = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.partition], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}
