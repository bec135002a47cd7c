//! SqliteIndex: search index backend on its own SQLite connection
//!
//! Objects live in an `objects` table partitioned by index name, so
//! several logical indexes can share one database file. Each object body
//! is the JSON projection including its `objectID`.
//!
//! Uses its own database connection (WAL mode) so index writes never
//! contend with the document store's connection.

use super::traits::{
    matches_query, merge_fields, Document, SearchIndex, StorageError, StorageResult,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Default index name for form projections
pub const DEFAULT_INDEX_NAME: &str = "forms";

/// Persistent search index backed by SQLite.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    index_name: String,
}

impl SqliteIndex {
    /// Open a persistent index at the given path.
    pub fn open(path: impl AsRef<Path>, index_name: impl Into<String>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_connection(conn, index_name.into())
    }

    /// Open an in-memory index (for tests).
    pub fn open_in_memory(index_name: impl Into<String>) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn, index_name.into())
    }

    fn init_connection(conn: Connection, index_name: String) -> StorageResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS objects (
                index_name TEXT NOT NULL,
                object_id TEXT NOT NULL,
                body_json TEXT NOT NULL,
                PRIMARY KEY (index_name, object_id)
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            index_name,
        })
    }

    /// The logical index this handle reads and writes.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn upsert(conn: &Connection, index_name: &str, object_id: &str, mut object: Document) -> StorageResult<()> {
        object.insert("objectID".to_string(), Value::String(object_id.to_string()));
        conn.execute(
            r#"
            INSERT INTO objects (index_name, object_id, body_json)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(index_name, object_id) DO UPDATE SET
                body_json = excluded.body_json
            "#,
            params![index_name, object_id, serde_json::to_string(&object)?],
        )?;
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for SqliteIndex {
    async fn partial_update(&self, object_id: &str, fields: Document) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body_json FROM objects WHERE index_name = ?1 AND object_id = ?2",
                params![self.index_name, object_id],
                |row| row.get(0),
            )
            .optional()?;

        // Missing objects are created from the partial fields.
        let mut object: Document = match body {
            Some(body) => serde_json::from_str(&body)?,
            None => Document::new(),
        };
        merge_fields(&mut object, fields);

        Self::upsert(&tx, &self.index_name, object_id, object)?;
        tx.commit()?;
        Ok(())
    }

    async fn save_object(&self, object_id: &str, object: Document) -> StorageResult<()> {
        let conn = self.conn()?;
        Self::upsert(&conn, &self.index_name, object_id, object)
    }

    async fn get_object(&self, object_id: &str) -> StorageResult<Option<Document>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body_json FROM objects WHERE index_name = ?1 AND object_id = ?2",
                params![self.index_name, object_id],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, object_id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM objects WHERE index_name = ?1 AND object_id = ?2",
            params![self.index_name, object_id],
        )?;
        Ok(deleted > 0)
    }

    async fn list_object_ids(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT object_id FROM objects WHERE index_name = ?1 ORDER BY object_id",
        )?;
        let rows = stmt.query_map(params![self.index_name], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT body_json FROM objects WHERE index_name = ?1 ORDER BY object_id",
        )?;
        let rows = stmt.query_map(params![self.index_name], |row| row.get::<_, String>(0))?;

        let mut hits = Vec::new();
        for row in rows {
            let object: Document = serde_json::from_str(&row?)?;
            if matches_query(&object, query) {
                hits.push(object);
            }
        }
        Ok(hits)
    }
}
