//! In-process backends for embedding and tests

use super::traits::{
    matches_query, merge_fields, Document, DocumentStore, IdentityChecker, SearchIndex,
    StorageError, StorageResult,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Document store held in a concurrent map.
///
/// Counts every successful write so callers can assert that a rejected
/// mutation touched nothing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: DashMap<(String, String), Document>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful create/update/delete calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        Ok(self.docs.get(&Self::key(collection, id)).map(|d| d.clone()))
    }

    async fn create(&self, collection: &str, id: &str, doc: Document) -> StorageResult<()> {
        let key = Self::key(collection, id);
        if self.docs.contains_key(&key) {
            return Err(StorageError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.docs.insert(key, doc);
        self.count_write();
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()> {
        let mut doc = self
            .docs
            .get_mut(&Self::key(collection, id))
            .ok_or_else(|| StorageError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_fields(&mut doc, fields);
        drop(doc);
        self.count_write();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<bool> {
        let existed = self.docs.remove(&Self::key(collection, id)).is_some();
        self.count_write();
        Ok(existed)
    }

    async fn list(&self, collection: &str) -> StorageResult<Vec<(String, Document)>> {
        let mut docs: Vec<_> = self
            .docs
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(docs)
    }
}

#[async_trait]
impl IdentityChecker for MemoryStore {
    async fn exists(&self, namespace: &str, identifier: &str) -> StorageResult<bool> {
        Ok(self.docs.contains_key(&Self::key(namespace, identifier)))
    }
}

/// Search index held in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    objects: DashMap<String, Document>,
    writes: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful partial_update/save_object/delete calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn partial_update(&self, object_id: &str, fields: Document) -> StorageResult<()> {
        let mut object = self.objects.entry(object_id.to_string()).or_default();
        object.insert("objectID".to_string(), Value::String(object_id.to_string()));
        merge_fields(&mut object, fields);
        drop(object);
        self.count_write();
        Ok(())
    }

    async fn save_object(&self, object_id: &str, mut object: Document) -> StorageResult<()> {
        object.insert("objectID".to_string(), Value::String(object_id.to_string()));
        self.objects.insert(object_id.to_string(), object);
        self.count_write();
        Ok(())
    }

    async fn get_object(&self, object_id: &str) -> StorageResult<Option<Document>> {
        Ok(self.objects.get(object_id).map(|o| o.clone()))
    }

    async fn delete(&self, object_id: &str) -> StorageResult<bool> {
        let existed = self.objects.remove(object_id).is_some();
        self.count_write();
        Ok(existed)
    }

    async fn list_object_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids: Vec<_> = self.objects.iter().map(|o| o.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<Document>> {
        let mut hits: Vec<_> = self
            .objects
            .iter()
            .filter(|o| matches_query(o.value(), query))
            .map(|o| (o.key().clone(), o.value().clone()))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(hits.into_iter().map(|(_, object)| object).collect())
    }
}
