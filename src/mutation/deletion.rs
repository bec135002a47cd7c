//! Deletion workflow: typed confirmation, then store and index deletes

use super::context::MutationContext;
use super::error::{MutationError, MutationResult};
use crate::form::FormId;
use tracing::{debug, info, warn};

/// Where the caller should go once the current view is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    FormsList,
}

impl Navigation {
    pub fn path(&self) -> &'static str {
        match self {
            Navigation::FormsList => "/forms",
        }
    }
}

/// Deletes a form from both stores once the caller has typed its name.
pub struct DeletionWorkflow {
    ctx: MutationContext,
}

impl DeletionWorkflow {
    pub fn new(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    /// Delete `id` if `confirmation` equals `expected_name` exactly.
    ///
    /// A mismatch touches neither store. The store delete runs first; if
    /// the index delete then fails the projection is left orphaned and
    /// `IndexDelete` is returned.
    pub async fn delete_form(
        &self,
        id: &FormId,
        confirmation: &str,
        expected_name: &str,
    ) -> MutationResult<Navigation> {
        if confirmation != expected_name {
            debug!(form = %id, "deletion confirmation mismatch");
            return Err(MutationError::ConfirmationMismatch);
        }

        let _guard = self.ctx.locks.lock(id).await;

        let existed = self
            .ctx
            .store
            .delete(&self.ctx.collection, id.as_str())
            .await
            .map_err(MutationError::StoreWrite)?;
        if !existed {
            debug!(form = %id, "record already absent from store");
        }

        if let Err(source) = self.ctx.index.delete(id.as_str()).await {
            warn!(form = %id, error = %source, "index delete failed; projection orphaned");
            return Err(MutationError::IndexDelete {
                id: id.clone(),
                source,
            });
        }

        self.ctx.locks.remove(id);
        info!(form = %id, "form deleted");
        Ok(Navigation::FormsList)
    }
}
