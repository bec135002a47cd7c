//! Storage backends
//!
//! The core talks to three collaborators through traits: the primary
//! `DocumentStore`, the secondary `SearchIndex`, and an `IdentityChecker`.
//! `SqliteStore` and `SqliteIndex` are the persistent implementations;
//! `MemoryStore` and `MemoryIndex` keep everything in process.

mod index;
mod memory;
mod sqlite;
mod traits;

pub use index::{SqliteIndex, DEFAULT_INDEX_NAME};
pub use memory::{MemoryIndex, MemoryStore};
pub use sqlite::SqliteStore;
pub use traits::{
    merge_fields, to_document, Document, DocumentStore, IdentityChecker, OpenStore,
    SearchIndex, StorageError, StorageResult,
};
