//! Per-record serialization of read-modify-write mutations

use crate::form::FormId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per form.
///
/// Holding a record's guard while re-reading it from the store and writing
/// the result back turns a toggle or a list edit into a read-modify-write
/// that cannot lose a concurrent change to the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordLocks {
    locks: Arc<DashMap<FormId, Arc<Mutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a record
    pub async fn lock(&self, id: &FormId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry for a deleted record
    pub fn remove(&self, id: &FormId) {
        self.locks.remove(id);
    }
}
