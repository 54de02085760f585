use crate::record::{Record, RecordImage};
use crate::settings::Settings;
use crate::sqlite_column;
use crate::sqlite_persistence::{ensure_schema, SqlType, Table, VersionedSchema};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, info};

use super::{LocalStore, SettingsStore, StoreError};

/// V 0
const RECORD_TABLE_V_0: Table = Table {
    name: "record",
    columns: &[
        sqlite_column!(
            "key",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!("image", &SqlType::Text),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_record_title", "title"),
        ("idx_record_updated_at", "updated_at"),
    ],
};
const BLOB_TABLE_V_0: Table = Table {
    name: "blob",
    columns: &[
        sqlite_column!(
            "name",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[RECORD_TABLE_V_0, BLOB_TABLE_V_0],
    migration: None,
}];

const SETTINGS_BLOB_NAME: &str = "settings";

/// SQLite backed device storage.
#[derive(Clone)]
pub struct SqliteLocalStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteLocalStore {
    /// Opens (creating if needed) the database at `db_path` and initializes it.
    pub fn open<T: AsRef<Path>>(db_path: T) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))
                    .map_err(StoreError::unavailable)?;
            }
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))
            .map_err(StoreError::unavailable)?;
        info!("Opened local store at {:?}", db_path);

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(db_path.to_path_buf()),
        };
        store.init()?;
        Ok(store)
    }

    /// A store living only in memory, for tests and ephemeral sessions.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::unavailable)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<(Record, String)> {
        let updated_at: String = row.get(4)?;
        let record = Record {
            key: row.get(0)?,
            title: row.get(1)?,
            notes: row.get(2)?,
            image: row.get::<_, Option<String>>(3)?.map(RecordImage::from),
            updated_at: DateTime::<Utc>::MIN_UTC,
        };
        Ok((record, updated_at))
    }

    fn finish_record((mut record, updated_at): (Record, String)) -> Result<Record, StoreError> {
        record.updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| {
                StoreError::read(format!(
                    "Invalid updated_at '{}' for record {}: {}",
                    updated_at, record.key, e
                ))
            })?
            .with_timezone(&Utc);
        Ok(record)
    }
}

impl LocalStore for SqliteLocalStore {
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let version = ensure_schema(&conn, VERSIONED_SCHEMAS).map_err(StoreError::unavailable)?;
        debug!("Local store schema at version {}", version);
        Ok(())
    }

    fn put(&self, mut record: Record) -> Result<Record, StoreError> {
        record.updated_at = Utc::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (key, title, notes, image, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                RECORD_TABLE_V_0.name
            ),
            params![
                record.key,
                record.title,
                record.notes,
                record.image.as_ref().map(RecordImage::as_str),
                // Fixed width so the updated_at index sorts chronologically.
                record.updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(|e| StoreError::write(format!("Failed to write record {}: {}", record.key, e)))?;
        debug!("Stored record {}", record.key);
        Ok(record)
    }

    fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!(
                    "SELECT key, title, notes, image, updated_at FROM {} WHERE key = ?1",
                    RECORD_TABLE_V_0.name
                ),
                params![key],
                Self::row_to_record,
            )
            .optional()
            .map_err(StoreError::read)?;
        row.map(Self::finish_record).transpose()
    }

    fn get_all(&self) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT key, title, notes, image, updated_at FROM {}",
                RECORD_TABLE_V_0.name
            ))
            .map_err(StoreError::read)?;
        let rows = stmt
            .query_map([], Self::row_to_record)
            .map_err(StoreError::read)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::read)?;
        rows.into_iter().map(Self::finish_record).collect()
    }

    fn get_all_by_recency(&self) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT key, title, notes, image, updated_at FROM {} ORDER BY updated_at DESC",
                RECORD_TABLE_V_0.name
            ))
            .map_err(StoreError::read)?;
        let rows = stmt
            .query_map([], Self::row_to_record)
            .map_err(StoreError::read)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::read)?;
        rows.into_iter().map(Self::finish_record).collect()
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let removed = conn
            .execute(
                &format!("DELETE FROM {} WHERE key = ?1", RECORD_TABLE_V_0.name),
                params![key],
            )
            .map_err(|e| StoreError::write(format!("Failed to delete record {}: {}", key, e)))?;
        Ok(removed > 0)
    }
}

impl SettingsStore for SqliteLocalStore {
    fn get_settings(&self) -> Result<Settings, StoreError> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE name = ?1", BLOB_TABLE_V_0.name),
                params![SETTINGS_BLOB_NAME],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::read)?;

        match value {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| StoreError::read(format!("Corrupted settings blob: {}", e))),
            None => Ok(Settings::new()),
        }
    }

    fn put_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let json = serde_json::to_string(settings).map_err(StoreError::write)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (name, value) VALUES (?1, ?2)",
                BLOB_TABLE_V_0.name
            ),
            params![SETTINGS_BLOB_NAME, json],
        )
        .map_err(|e| StoreError::write(format!("Failed to write settings: {}", e)))?;
        Ok(())
    }
}
