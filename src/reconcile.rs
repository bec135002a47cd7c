//! Store-to-index reconciliation sweep
//!
//! The dual write never rolls back, so the index can fall behind the store
//! after an index failure, and a failed index delete leaves an orphaned
//! projection. A sweep compares every stored record with its projection and
//! repairs the index from the store, which is the source of truth.

use crate::form::{FormId, FormRecord, SearchProjection};
use crate::mutation::MutationContext;
use crate::storage::{Document, StorageResult};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What a sweep found and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records examined
    pub checked: usize,
    pub in_sync: usize,
    /// Projections whose mirrored fields were re-pushed
    pub repaired: usize,
    /// Missing projections saved from the store
    pub restored: usize,
    /// Projections removed because their record is gone
    pub orphans_removed: usize,
    /// Store documents that could not be decoded as forms
    pub skipped: usize,
}

impl ReconcileReport {
    /// True if the sweep changed nothing
    pub fn is_clean(&self) -> bool {
        self.repaired == 0 && self.restored == 0 && self.orphans_removed == 0
    }
}

/// Mirrored fields of `expected` that `actual` disagrees on.
///
/// A field absent from `actual` counts as null.
pub fn diverged_fields(expected: &Document, actual: &Document) -> Document {
    expected
        .iter()
        .filter(|(key, value)| actual.get(key.as_str()).unwrap_or(&Value::Null) != *value)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Keys `actual` holds with a value that `expected` does not project at all
pub fn stale_keys<'a>(expected: &Document, actual: &'a Document) -> Vec<&'a str> {
    actual
        .iter()
        .filter(|(key, value)| !value.is_null() && !expected.contains_key(key.as_str()))
        .map(|(key, _)| key.as_str())
        .collect()
}

/// Repairs the index from the store.
pub struct Reconciler {
    ctx: MutationContext,
}

impl Reconciler {
    pub fn new(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    /// Compare every record with its projection and repair the index.
    ///
    /// Each record is handled under its lock, so a sweep never interleaves
    /// with a mutation of the same record.
    pub async fn sweep(&self) -> StorageResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let stored = self.ctx.store.list(&self.ctx.collection).await?;
        let mut live: HashSet<String> = HashSet::with_capacity(stored.len());

        for (id, _) in stored {
            live.insert(id.clone());
            let form_id = FormId::from_string(id.as_str());
            let _guard = self.ctx.locks.lock(&form_id).await;

            // Re-read under the lock; the listing may be stale.
            let Some(doc) = self.ctx.store.read(&self.ctx.collection, &id).await? else {
                live.remove(&id);
                continue;
            };
            let record = match FormRecord::from_document(doc) {
                Ok(record) => record,
                Err(e) => {
                    warn!(form = %id, error = %e, "skipping undecodable record");
                    report.skipped += 1;
                    continue;
                }
            };
            report.checked += 1;

            let expected = SearchProjection::from_record(&record, self.ctx.mirror_collaborators)
                .to_document()?;
            match self.ctx.index.get_object(&id).await? {
                None => {
                    self.ctx.index.save_object(&id, expected).await?;
                    info!(form = %id, "projection restored");
                    report.restored += 1;
                }
                Some(actual) => {
                    let stale = stale_keys(&expected, &actual);
                    let diff = diverged_fields(&expected, &actual);
                    if !stale.is_empty() {
                        // A partial update cannot drop keys; replace the object.
                        info!(form = %id, ?stale, "projection replaced");
                        self.ctx.index.save_object(&id, expected).await?;
                        report.repaired += 1;
                    } else if diff.is_empty() {
                        report.in_sync += 1;
                    } else {
                        let fields: Vec<&str> = diff.keys().map(String::as_str).collect();
                        info!(form = %id, ?fields, "projection repaired");
                        self.ctx.index.partial_update(&id, diff).await?;
                        report.repaired += 1;
                    }
                }
            }
        }

        for object_id in self.ctx.index.list_object_ids().await? {
            if live.contains(&object_id) {
                continue;
            }
            // A record created since the listing is not an orphan.
            if self.ctx.store.read(&self.ctx.collection, &object_id).await?.is_some() {
                continue;
            }
            if self.ctx.index.delete(&object_id).await? {
                info!(form = %object_id, "orphaned projection removed");
                report.orphans_removed += 1;
            }
        }

        debug!(?report, "reconcile sweep finished");
        Ok(report)
    }
}
