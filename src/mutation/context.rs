//! Shared collaborators of every mutator, and the dual-write sequence

use super::error::{MutationError, MutationResult};
use super::locks::RecordLocks;
use crate::form::{FormId, FormPatch, FormRecord, SnapshotCache};
use crate::storage::{DocumentStore, IdentityChecker, SearchIndex};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default collection holding form records
pub const DEFAULT_COLLECTION: &str = "forms";

/// Default namespace consulted for collaborator identifiers
pub const DEFAULT_USERS_NAMESPACE: &str = "users";

/// The adapters and settings a mutator works against.
///
/// Cheap to clone; every mutator built from the same context shares the
/// same adapters, the same per-record locks and the same snapshots.
#[derive(Clone)]
pub struct MutationContext {
    pub store: Arc<dyn DocumentStore>,
    pub index: Arc<dyn SearchIndex>,
    pub identity: Arc<dyn IdentityChecker>,
    pub locks: RecordLocks,
    /// Current view of each form, published by completed writes
    pub snapshots: Arc<SnapshotCache>,
    pub collection: String,
    pub users_namespace: String,
    /// Whether the index projection carries `collaborators`
    pub mirror_collaborators: bool,
}

impl MutationContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
        identity: Arc<dyn IdentityChecker>,
    ) -> Self {
        Self {
            store,
            index,
            identity,
            locks: RecordLocks::new(),
            snapshots: Arc::new(SnapshotCache::new()),
            collection: DEFAULT_COLLECTION.to_string(),
            users_namespace: DEFAULT_USERS_NAMESPACE.to_string(),
            mirror_collaborators: true,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_users_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.users_namespace = namespace.into();
        self
    }

    pub fn with_mirror_collaborators(mut self, mirror: bool) -> Self {
        self.mirror_collaborators = mirror;
        self
    }

    /// Read a form from the store (not from any cached snapshot)
    pub async fn read_form(&self, id: &FormId) -> MutationResult<FormRecord> {
        let doc = self
            .store
            .read(&self.collection, id.as_str())
            .await
            .map_err(MutationError::StoreRead)?
            .ok_or_else(|| MutationError::NotFound(id.clone()))?;
        FormRecord::from_document(doc).map_err(MutationError::StoreRead)
    }

    /// Publish the record as the store now holds it.
    ///
    /// Callers hold the record's lock, so tickets follow store-write order.
    pub(crate) fn publish(&self, record: &FormRecord) {
        self.snapshots.publish_now(record.clone());
    }

    /// Write a patch to the store only, then publish `next`
    pub(crate) async fn write_store(
        &self,
        id: &FormId,
        patch: &FormPatch,
        next: &FormRecord,
    ) -> MutationResult<()> {
        let fields = patch.to_fields().map_err(MutationError::StoreWrite)?;
        self.store
            .update(&self.collection, id.as_str(), fields)
            .await
            .map_err(MutationError::StoreWrite)?;
        self.publish(next);
        debug!(form = %id, "store updated");
        Ok(())
    }

    /// Write a patch to the store, then push the same fields to the index.
    ///
    /// The field map is encoded once and shared by both writes. A store
    /// failure stops before the index is touched. An index failure after
    /// a committed store write is reported as `IndexWrite` carrying `next`
    /// (the record as the store now holds it); nothing is rolled back.
    /// Once the store has committed, `next` is published either way.
    pub(crate) async fn dual_write(
        &self,
        id: &FormId,
        patch: &FormPatch,
        next: &FormRecord,
    ) -> MutationResult<()> {
        let fields = patch.to_fields().map_err(MutationError::StoreWrite)?;

        self.store
            .update(&self.collection, id.as_str(), fields.clone())
            .await
            .map_err(MutationError::StoreWrite)?;
        self.publish(next);

        if let Err(source) = self.index.partial_update(id.as_str(), fields).await {
            warn!(form = %id, error = %source, "index write failed after store commit; store and index diverged");
            return Err(MutationError::IndexWrite {
                id: id.clone(),
                source,
                committed: Some(Box::new(next.clone())),
            });
        }

        debug!(form = %id, "store and index updated");
        Ok(())
    }
}
