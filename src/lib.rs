//! formsync: form records kept consistent across two stores
//!
//! A form lives in a primary document store, and a denormalized projection
//! of it lives in a search index. Every mutation writes the store first and
//! the index second, with the same field values, and reports a divergence
//! instead of rolling back when the second write fails.
//!
//! # Core Concepts
//!
//! - **Record**: the authoritative `FormRecord` in the document store
//! - **Projection**: the `SearchProjection` of a record held by the index
//! - **Snapshot**: the caller's current view of a record, replaced only by
//!   the most recently completed mutation
//! - **Reconcile**: a sweep that repairs the index from the store
//!
//! # Example
//!
//! ```
//! use formsync::{FormSettings, FormsApi, MemoryIndex, MemoryStore};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! let api = FormsApi::with_adapters(store.clone(), Arc::new(MemoryIndex::new()), store);
//! let form = api
//!     .create_form("alice", FormSettings::new("Contact", "Say hi", "#336699"))
//!     .await
//!     .unwrap();
//! assert_eq!(api.get_form(&form.id).await.unwrap().name(), "Contact");
//! # });
//! ```

pub mod api;
pub mod config;
pub mod form;
pub mod mutation;
pub mod reconcile;
pub mod storage;

pub use api::FormsApi;
pub use config::{ConfigError, FormsConfig};
pub use form::{
    Answer, FieldError, FormId, FormPatch, FormRecord, FormSettings, Response, SearchProjection,
    SettingsField,
};
pub use mutation::{
    Membership, MutationContext, MutationError, MutationKind, MutationResult, MutationStatus,
    Navigation,
};
pub use reconcile::{ReconcileReport, Reconciler};
pub use storage::{
    Document, DocumentStore, IdentityChecker, MemoryIndex, MemoryStore, OpenStore, SearchIndex,
    SqliteIndex, SqliteStore, StorageError, StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
