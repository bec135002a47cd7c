//! Common test utilities for formsync integration tests
//!
//! Journaling adapters and record builders shared by the test binaries.

#![allow(dead_code)]

pub mod fakes;

pub use fakes::{Harness, Journal, JournalIndex, JournalStore, Latency, Op};

use formsync::{FormId, FormRecord, FormSettings, Response, SearchProjection};
use formsync::{DocumentStore, SearchIndex};

/// Save a record to both stores, then clear the journal
pub async fn seed(harness: &Harness, record: &FormRecord) {
    harness
        .store
        .create("forms", record.id.as_str(), record.to_document().unwrap())
        .await
        .unwrap();
    harness
        .index
        .save_object(
            record.id.as_str(),
            SearchProjection::from_record(record, true).to_document().unwrap(),
        )
        .await
        .unwrap();
    harness.journal.clear();
}

pub fn form(id: &str, name: &str) -> FormRecord {
    FormRecord::with_id(FormId::from_string(id), FormSettings::new(name, "d", "#fff"))
}

pub fn responses(ids: &[&str]) -> Vec<Response> {
    ids.iter()
        .map(|id| Response::with_id(*id, vec![formsync::Answer::new("Q", format!("answer {id}"))]))
        .collect()
}
