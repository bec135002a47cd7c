//! Caller-visible mutation status
//!
//! Each action exposes `is_loading` / `is_error` / `is_success` and
//! `reset()`. Starting an action while the same action is still loading is
//! refused, which is how re-triggering of destructive or rate-limited
//! actions is disabled while a call is outstanding.

use super::error::{MutationError, MutationKind, MutationResult};
use crate::form::FormId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const LOADING: u8 = 1;
const SUCCESS: u8 = 2;
const ERROR: u8 = 3;

/// Status flags for one action. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MutationStatus {
    state: Arc<AtomicU8>,
}

impl MutationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.state.load(Ordering::SeqCst) == LOADING
    }

    pub fn is_success(&self) -> bool {
        self.state.load(Ordering::SeqCst) == SUCCESS
    }

    pub fn is_error(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ERROR
    }

    /// Clear success/error flags. A call in flight stays loading.
    pub fn reset(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                (s != LOADING).then_some(IDLE)
            });
    }

    /// Mark the action as loading.
    ///
    /// Fails with `Busy` if it already is.
    pub fn begin(&self, kind: MutationKind) -> MutationResult<InFlight> {
        let previous = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                (s != LOADING).then_some(LOADING)
            })
            .map_err(|_| MutationError::Busy(kind))?;

        Ok(InFlight {
            state: self.state.clone(),
            previous,
            settled: false,
        })
    }
}

/// An outstanding call. Settles the status when finished or dropped.
#[derive(Debug)]
pub struct InFlight {
    state: Arc<AtomicU8>,
    previous: u8,
    settled: bool,
}

impl InFlight {
    /// Settle the status from the call's result.
    ///
    /// Faults set the error flag. Rejections raised before any write
    /// (validation, no-op, unknown user) leave the flags as they were.
    pub fn finish<T>(mut self, result: &MutationResult<T>) {
        let next = match result {
            Ok(_) => SUCCESS,
            Err(e) if e.is_fault() => ERROR,
            Err(_) => self.previous,
        };
        self.state.store(next, Ordering::SeqCst);
        self.settled = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            self.state.store(ERROR, Ordering::SeqCst);
        }
    }
}

/// Status of every (action, form) pair the caller has touched
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: DashMap<(MutationKind, FormId), MutationStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the status for an action on a form
    pub fn get(&self, kind: MutationKind, id: &FormId) -> MutationStatus {
        self.statuses
            .entry((kind, id.clone()))
            .or_default()
            .clone()
    }
}
