//! Storage trait definitions

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// A raw JSON document as held by a store or index
pub type Document = Map<String, Value>;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Encode any serializable value as a document.
///
/// Fails with `Malformed` when the value is not a JSON object.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> StorageResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::Malformed(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Overwrite the top-level keys of `target` with those of `fields`
pub fn merge_fields(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// The primary, authoritative record store.
///
/// Records are grouped into named collections and addressed by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it does not exist
    async fn read(&self, collection: &str, id: &str) -> StorageResult<Option<Document>>;

    /// Insert a new document; fails if the id is taken
    async fn create(&self, collection: &str, id: &str, doc: Document) -> StorageResult<()>;

    /// Merge `fields` into an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> StorageResult<bool>;

    /// List every document in a collection, ordered by id
    async fn list(&self, collection: &str) -> StorageResult<Vec<(String, Document)>>;
}

/// The secondary search index holding projections of store records.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Merge `fields` into the object, creating it if absent
    async fn partial_update(&self, object_id: &str, fields: Document) -> StorageResult<()>;

    /// Replace the whole object
    async fn save_object(&self, object_id: &str, object: Document) -> StorageResult<()>;

    /// Fetch an object, `None` if it does not exist
    async fn get_object(&self, object_id: &str) -> StorageResult<Option<Document>>;

    /// Delete an object. Returns whether it existed.
    async fn delete(&self, object_id: &str) -> StorageResult<bool>;

    /// Every object id held by the index
    async fn list_object_ids(&self) -> StorageResult<Vec<String>>;

    /// Case-insensitive substring match on `name` and `description`
    async fn search(&self, query: &str) -> StorageResult<Vec<Document>>;
}

/// Answers whether an identifier exists in a namespace (e.g. `users`)
#[async_trait]
pub trait IdentityChecker: Send + Sync {
    async fn exists(&self, namespace: &str, identifier: &str) -> StorageResult<bool>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

/// Shared matcher for `SearchIndex::search` implementations
pub(crate) fn matches_query(object: &Document, query: &str) -> bool {
    let needle = query.to_lowercase();
    ["name", "description"].iter().any(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}
