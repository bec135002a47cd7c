//! SQLite document store backend

use super::traits::{
    merge_fields, Document, DocumentStore, IdentityChecker, OpenStore, StorageError,
    StorageResult,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed document store
///
/// Uses a single `documents` table keyed by `(collection, id)` with the
/// document body stored as JSON. Thread-safe via internal mutex on the
/// connection.
///
/// Also answers identity checks: a namespace is a collection, and an
/// identifier exists when a document with that id is present.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    fn decode(body_json: &str) -> StorageResult<Document> {
        Ok(serde_json::from_str(body_json)?)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn read(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body_json FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.as_deref().map(Self::decode).transpose()
    }

    async fn create(&self, collection: &str, id: &str, doc: Document) -> StorageResult<()> {
        let body = serde_json::to_string(&doc)?;
        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO documents (collection, id, body_json, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, id) DO NOTHING
            "#,
            params![collection, id, body, Self::now()],
        )?;

        if inserted == 0 {
            return Err(StorageError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // Read-merge-write inside one transaction so concurrent partial
        // updates to disjoint fields don't drop each other.
        let body: Option<String> = tx
            .query_row(
                "SELECT body_json FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Err(StorageError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        let mut doc = Self::decode(&body)?;
        merge_fields(&mut doc, fields);

        tx.execute(
            "UPDATE documents SET body_json = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            params![collection, id, serde_json::to_string(&doc)?, Self::now()],
        )?;
        tx.commit()?;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(deleted > 0)
    }

    async fn list(&self, collection: &str) -> StorageResult<Vec<(String, Document)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, body_json FROM documents WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            docs.push((id, Self::decode(&body)?));
        }
        Ok(docs)
    }
}

#[async_trait]
impl IdentityChecker for SqliteStore {
    async fn exists(&self, namespace: &str, identifier: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let found: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM documents WHERE collection = ?1 AND id = ?2",
            params![namespace, identifier],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let store = create_test_store();
        store
            .create("forms", "f1", doc(json!({"name": "A", "color": "#fff"})))
            .await
            .unwrap();

        let loaded = store.read("forms", "f1").await.unwrap().unwrap();
        assert_eq!(loaded["name"], json!("A"));
        assert!(store.read("forms", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = create_test_store();
        store.create("forms", "x", doc(json!({"a": 1}))).await.unwrap();

        assert!(store.read("users", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let store = create_test_store();
        store.create("forms", "f1", doc(json!({}))).await.unwrap();

        let err = store.create("forms", "f1", doc(json!({}))).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = create_test_store();
        store
            .create("forms", "f1", doc(json!({"name": "A", "color": "#fff"})))
            .await
            .unwrap();

        store
            .update("forms", "f1", doc(json!({"name": "B", "collaborators": ["bob"]})))
            .await
            .unwrap();

        let loaded = store.read("forms", "f1").await.unwrap().unwrap();
        assert_eq!(loaded["name"], json!("B"));
        assert_eq!(loaded["color"], json!("#fff"));
        assert_eq!(loaded["collaborators"], json!(["bob"]));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = create_test_store();
        let err = store
            .update("forms", "ghost", doc(json!({"name": "B"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = create_test_store();
        store.create("forms", "f1", doc(json!({}))).await.unwrap();

        assert!(store.delete("forms", "f1").await.unwrap());
        assert!(!store.delete("forms", "f1").await.unwrap());
        assert!(store.read("forms", "f1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ordered_by_id() {
        let store = create_test_store();
        store.create("forms", "b", doc(json!({}))).await.unwrap();
        store.create("forms", "a", doc(json!({}))).await.unwrap();
        store.create("users", "c", doc(json!({}))).await.unwrap();

        let ids: Vec<_> = store
            .list("forms")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_exists_checks_namespace() {
        let store = create_test_store();
        store.create("users", "alice", doc(json!({"pseudo": "alice"}))).await.unwrap();

        assert!(store.exists("users", "alice").await.unwrap());
        assert!(!store.exists("users", "bob").await.unwrap());
        assert!(!store.exists("forms", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_advances_updated_at() {
        let store = create_test_store();
        store.create("forms", "f1", doc(json!({}))).await.unwrap();
        let stamp = |store: &SqliteStore| -> String {
            store
                .conn()
                .unwrap()
                .query_row(
                    "SELECT updated_at FROM documents WHERE collection = 'forms' AND id = 'f1'",
                    [],
                    |row| row.get(0),
                )
                .unwrap()
        };
        let created = stamp(&store);

        store
            .update("forms", "f1", doc(json!({"name": "B"})))
            .await
            .unwrap();

        assert!(!created.is_empty());
        assert!(stamp(&store) >= created);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("forms.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create("forms", "f1", doc(json!({"name": "A"}))).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.read("forms", "f1").await.unwrap().unwrap();
        assert_eq!(loaded["name"], json!("A"));
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let store = SqliteStore::open(&path).unwrap();

        let conn = store.conn().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }
}
