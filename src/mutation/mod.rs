//! Mutators over the dual store
//!
//! Every mutator takes the caller's current view of a record, writes to the
//! document store first and the search index second, and returns the next
//! state. Nothing is rolled back: an index failure after a store commit is
//! reported as a divergence.

mod collaborators;
mod context;
mod creation;
mod deletion;
mod error;
mod locks;
mod responses;
mod settings;
mod status;

pub use collaborators::{toggle_membership, CollaboratorMutator, Membership};
pub use context::{MutationContext, DEFAULT_COLLECTION, DEFAULT_USERS_NAMESPACE};
pub use creation::FormCreator;
pub use deletion::{DeletionWorkflow, Navigation};
pub use error::{MutationError, MutationKind, MutationResult, GENERIC_FAILURE_MESSAGE};
pub use locks::RecordLocks;
pub use responses::{without_response, ResponseMutator};
pub use settings::SettingsMutator;
pub use status::{InFlight, MutationStatus, StatusBoard};
