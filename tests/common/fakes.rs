//! Journaling adapters
//!
//! Wrap the in-memory backends and record every adapter call, in order,
//! into a shared journal so tests can assert on write ordering and on the
//! exact field values each store received. Store updates and index reads
//! can be slowed down to force interleavings between concurrent calls.

use async_trait::async_trait;
use formsync::{
    Document, DocumentStore, IdentityChecker, MemoryIndex, MemoryStore, MutationContext,
    SearchIndex, StorageError, StorageResult,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One adapter call
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    StoreRead { id: String },
    StoreCreate { collection: String, id: String },
    StoreUpdate { id: String, fields: Document },
    StoreDelete { id: String },
    IndexPartialUpdate { id: String, fields: Document },
    IndexSave { id: String },
    IndexDelete { id: String },
    Exists { namespace: String, id: String },
}

impl Op {
    pub fn is_write(&self) -> bool {
        !matches!(self, Op::StoreRead { .. } | Op::Exists { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Op::StoreDelete { .. } | Op::IndexDelete { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    ops: Arc<Mutex<Vec<Op>>>,
}

impl Journal {
    fn push(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Op> {
        self.ops().into_iter().filter(Op::is_write).collect()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }
}

/// Artificial latency, in milliseconds
#[derive(Debug, Default)]
pub struct Latency(AtomicU64);

impl Latency {
    pub fn set(&self, delay: Duration) {
        self.0.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn wait(&self) {
        let ms = self.0.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

pub struct JournalStore {
    inner: MemoryStore,
    journal: Journal,
    /// Applied to every `update` before it reaches the store
    pub update_latency: Latency,
}

#[async_trait]
impl DocumentStore for JournalStore {
    async fn read(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        self.journal.push(Op::StoreRead { id: id.into() });
        self.inner.read(collection, id).await
    }

    async fn create(&self, collection: &str, id: &str, doc: Document) -> StorageResult<()> {
        self.journal.push(Op::StoreCreate {
            collection: collection.into(),
            id: id.into(),
        });
        self.inner.create(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()> {
        self.update_latency.wait().await;
        self.journal.push(Op::StoreUpdate {
            id: id.into(),
            fields: fields.clone(),
        });
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<bool> {
        self.journal.push(Op::StoreDelete { id: id.into() });
        self.inner.delete(collection, id).await
    }

    async fn list(&self, collection: &str) -> StorageResult<Vec<(String, Document)>> {
        self.inner.list(collection).await
    }
}

#[async_trait]
impl IdentityChecker for JournalStore {
    async fn exists(&self, namespace: &str, identifier: &str) -> StorageResult<bool> {
        self.journal.push(Op::Exists {
            namespace: namespace.into(),
            id: identifier.into(),
        });
        self.inner.exists(namespace, identifier).await
    }
}

/// Index that journals calls and can be switched offline
pub struct JournalIndex {
    inner: MemoryIndex,
    journal: Journal,
    offline: AtomicBool,
    /// Applied to every `get_object`
    pub read_latency: Latency,
}

impl JournalIndex {
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("index request timed out".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SearchIndex for JournalIndex {
    async fn partial_update(&self, object_id: &str, fields: Document) -> StorageResult<()> {
        self.journal.push(Op::IndexPartialUpdate {
            id: object_id.into(),
            fields: fields.clone(),
        });
        self.check()?;
        self.inner.partial_update(object_id, fields).await
    }

    async fn save_object(&self, object_id: &str, object: Document) -> StorageResult<()> {
        self.journal.push(Op::IndexSave { id: object_id.into() });
        self.check()?;
        self.inner.save_object(object_id, object).await
    }

    async fn get_object(&self, object_id: &str) -> StorageResult<Option<Document>> {
        self.read_latency.wait().await;
        self.inner.get_object(object_id).await
    }

    async fn delete(&self, object_id: &str) -> StorageResult<bool> {
        self.journal.push(Op::IndexDelete { id: object_id.into() });
        self.check()?;
        self.inner.delete(object_id).await
    }

    async fn list_object_ids(&self) -> StorageResult<Vec<String>> {
        self.inner.list_object_ids().await
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<Document>> {
        self.inner.search(query).await
    }
}

/// Journaling adapters sharing one journal
pub struct Harness {
    pub store: Arc<JournalStore>,
    pub index: Arc<JournalIndex>,
    pub journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            store: Arc::new(JournalStore {
                inner: MemoryStore::new(),
                journal: journal.clone(),
                update_latency: Latency::default(),
            }),
            index: Arc::new(JournalIndex {
                inner: MemoryIndex::new(),
                journal: journal.clone(),
                offline: AtomicBool::new(false),
                read_latency: Latency::default(),
            }),
            journal,
        }
    }

    pub fn context(&self) -> MutationContext {
        MutationContext::new(self.store.clone(), self.index.clone(), self.store.clone())
    }

    /// Register users directly in the store, bypassing the journal
    pub async fn register(&self, users: &[&str]) {
        for user in users {
            self.store
                .inner
                .create("users", user, Document::new())
                .await
                .unwrap();
        }
    }
}
