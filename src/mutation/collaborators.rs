//! Collaborator set mutator: toggle a user in or out of a form's team

use super::context::MutationContext;
use super::error::{MutationError, MutationResult};
use crate::form::{FormPatch, FormRecord};
use tracing::{debug, info};

/// Remove `user` if present, otherwise append it.
///
/// Any duplicate entries of `user` are dropped along the way, so the result
/// never holds the same identifier twice.
pub fn toggle_membership(collaborators: &[String], user: &str) -> Vec<String> {
    if collaborators.iter().any(|c| c == user) {
        collaborators.iter().filter(|c| *c != user).cloned().collect()
    } else {
        let mut next = collaborators.to_vec();
        next.push(user.to_string());
        next
    }
}

/// Whether a toggle added or removed the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Added,
    Removed,
}

/// Toggles collaborator membership on a record.
pub struct CollaboratorMutator {
    ctx: MutationContext,
}

impl CollaboratorMutator {
    pub fn new(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    /// Toggle `candidate` in the collaborator set of `current`.
    ///
    /// The candidate must exist in the users namespace. The membership
    /// decision is taken against a fresh store read while holding the
    /// record's lock, so two concurrent toggles for different users both
    /// survive. Returns the next state of the record.
    pub async fn toggle(
        &self,
        current: &FormRecord,
        candidate: &str,
    ) -> MutationResult<(FormRecord, Membership)> {
        if candidate.trim().is_empty() {
            return Err(MutationError::InvalidInput("user identifier must not be empty"));
        }

        let exists = self
            .ctx
            .identity
            .exists(&self.ctx.users_namespace, candidate)
            .await
            .map_err(MutationError::IdentityCheck)?;
        if !exists {
            debug!(form = %current.id, user = candidate, "unknown user; collaborators untouched");
            return Err(MutationError::UnknownUser(candidate.to_string()));
        }

        let _guard = self.ctx.locks.lock(&current.id).await;
        let mut next = self.ctx.read_form(&current.id).await?;

        let membership = if next.has_collaborator(candidate) {
            Membership::Removed
        } else {
            Membership::Added
        };
        let patch = FormPatch::collaborators(toggle_membership(&next.collaborators, candidate));
        patch.apply_to(&mut next);

        if self.ctx.mirror_collaborators {
            self.ctx.dual_write(&current.id, &patch, &next).await?;
        } else {
            self.ctx.write_store(&current.id, &patch, &next).await?;
        }

        info!(form = %current.id, user = candidate, ?membership, "collaborators updated");
        Ok((next, membership))
    }
}
