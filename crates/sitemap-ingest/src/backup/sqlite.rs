//! SQLite-backed durable tier

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sitemap_common::{BackupRecord, Record};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{DurableStore, StoreError};

const SELECT_COLUMNS: &str = "SELECT id, timestamp, group_name, entry_count, records, \
                              description, version, checksum FROM backups";

/// Durable tier stored in a local SQLite database, one row per backup
#[derive(Clone)]
pub struct SqliteDurableStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteDurableStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        f(&conn)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS backups (
            id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            group_name TEXT NOT NULL,
            entry_count INTEGER NOT NULL,
            records TEXT NOT NULL,  -- JSON array
            description TEXT NOT NULL,
            version TEXT NOT NULL,
            checksum TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_backups_timestamp ON backups(timestamp DESC);
        "#,
    )?;
    Ok(())
}

fn row_to_backup(row: &Row<'_>) -> rusqlite::Result<BackupRecord> {
    let records_json: String = row.get(4)?;
    let records: Vec<Record> = serde_json::from_str(&records_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(BackupRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        group: row.get(2)?,
        entry_count: row.get::<_, i64>(3)? as usize,
        records,
        description: row.get(5)?,
        version: row.get(6)?,
        checksum: row.get(7)?,
    })
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn put(&self, record: &BackupRecord) -> Result<(), StoreError> {
        let records_json = serde_json::to_string(&record.records)?;

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO backups (
                    id, timestamp, group_name, entry_count, records,
                    description, version, checksum
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    record.id,
                    record.timestamp,
                    record.group,
                    record.entry_count as i64,
                    records_json,
                    record.description,
                    record.version,
                    record.checksum,
                ],
            )?;
            Ok(())
        })
    }

    async fn get(&self, id: &str) -> Result<Option<BackupRecord>, StoreError> {
        self.with_conn(|conn| {
            let backup = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                    params![id],
                    row_to_backup,
                )
                .optional()?;
            Ok(backup)
        })
    }

    async fn all(&self) -> Result<Vec<BackupRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{} ORDER BY timestamp DESC, rowid DESC", SELECT_COLUMNS))?;
            let rows = stmt.query_map([], row_to_backup)?;
            let backups = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(backups)
        })
    }
}
