//! Mutation error taxonomy

use crate::form::{FieldError, FormId, FormRecord};
use crate::storage::StorageError;
use thiserror::Error;

/// Message shown for any adapter fault. The caller cannot tell which
/// store failed, so no partial-success detail is exposed.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong, please try again.";

/// Which caller-facing action a mutation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Settings,
    Collaborators,
    ResponseDeletion,
    ResponseSubmission,
    FormDeletion,
    FormCreation,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Settings => write!(f, "settings update"),
            Self::Collaborators => write!(f, "collaborator update"),
            Self::ResponseDeletion => write!(f, "response deletion"),
            Self::ResponseSubmission => write!(f, "response submission"),
            Self::FormDeletion => write!(f, "form deletion"),
            Self::FormCreation => write!(f, "form creation"),
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by the mutators.
///
/// Validation, policy and precondition errors are raised before any write.
/// Adapter faults carry the underlying `StorageError`.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("no changes to save")]
    NoChange,

    #[error("user does not exist: {0}")]
    UnknownUser(String),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("confirmation does not match the form name")]
    ConfirmationMismatch,

    #[error("a {0} is already in progress")]
    Busy(MutationKind),

    #[error("form not found: {0}")]
    NotFound(FormId),

    #[error("store read failed: {0}")]
    StoreRead(#[source] StorageError),

    #[error("store write failed: {0}")]
    StoreWrite(#[source] StorageError),

    #[error("identity check failed: {0}")]
    IdentityCheck(#[source] StorageError),

    /// The store write committed but the index write did not; the two
    /// copies now disagree until a later write or a reconcile sweep.
    #[error("index write failed for {id} after store commit: {source}")]
    IndexWrite {
        id: FormId,
        source: StorageError,
        /// Record as committed to the store
        committed: Option<Box<FormRecord>>,
    },

    /// The store record is gone but its projection is still indexed.
    #[error("index delete failed for {id}, projection orphaned: {source}")]
    IndexDelete { id: FormId, source: StorageError },
}

/// Result type for mutations
pub type MutationResult<T> = Result<T, MutationError>;

impl MutationError {
    /// True for adapter-level faults, false for rejections raised before
    /// any write was attempted.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::StoreRead(_)
                | Self::StoreWrite(_)
                | Self::IdentityCheck(_)
                | Self::IndexWrite { .. }
                | Self::IndexDelete { .. }
        )
    }

    /// True when the store committed and the index did not follow.
    pub fn is_divergent(&self) -> bool {
        matches!(self, Self::IndexWrite { .. } | Self::IndexDelete { .. })
    }

    /// Per-field errors, if this is a validation failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(fields) => fields,
            _ => &[],
        }
    }

    /// Text to show the caller
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(fields) => fields
                .iter()
                .map(|f| f.message)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::NoChange => "You have not made any changes".to_string(),
            Self::UnknownUser(_) => "This user does not exist".to_string(),
            Self::InvalidInput(msg) => msg.to_string(),
            Self::ConfirmationMismatch => {
                "Enter the form name exactly to confirm deletion".to_string()
            }
            Self::Busy(_) => "Please wait for the previous request to finish".to_string(),
            Self::NotFound(_) => "This form does not exist".to_string(),
            Self::StoreRead(_)
            | Self::StoreWrite(_)
            | Self::IdentityCheck(_)
            | Self::IndexWrite { .. }
            | Self::IndexDelete { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
