//! SnapshotCache: the shared in-memory view of each form

use super::record::{FormId, FormRecord};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct Snapshot {
    record: FormRecord,
    /// Completion ticket of the write that produced this snapshot
    ticket: u64,
}

/// Latest known state of every form the caller has looked at.
///
/// Mutations publish their result here when they complete. Tickets are
/// handed out in completion order, and a snapshot is only replaced by a
/// publication carrying a newer ticket, so a slow completion can never
/// clobber the result of a later one.
#[derive(Debug)]
pub struct SnapshotCache {
    snapshots: DashMap<FormId, Snapshot>,
    next_ticket: AtomicU64,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Take the next completion ticket
    pub fn ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish a record under a ticket.
    ///
    /// Returns false (and leaves the cache alone) when a newer ticket has
    /// already been published for the same form.
    pub fn publish(&self, record: FormRecord, ticket: u64) -> bool {
        match self.snapshots.entry(record.id.clone()) {
            Entry::Occupied(mut existing) => {
                if existing.get().ticket > ticket {
                    return false;
                }
                existing.insert(Snapshot { record, ticket });
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(Snapshot { record, ticket });
                true
            }
        }
    }

    /// Publish a record under a freshly issued ticket
    pub fn publish_now(&self, record: FormRecord) {
        let ticket = self.ticket();
        self.publish(record, ticket);
    }

    /// Get the current snapshot of a form
    pub fn get(&self, id: &FormId) -> Option<FormRecord> {
        self.snapshots.get(id).map(|s| s.record.clone())
    }

    /// Drop a form from the cache
    pub fn evict(&self, id: &FormId) -> Option<FormRecord> {
        self.snapshots.remove(id).map(|(_, s)| s.record)
    }

    pub fn contains(&self, id: &FormId) -> bool {
        self.snapshots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
