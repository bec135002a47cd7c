//! Form creation and user registration

use super::context::MutationContext;
use super::error::{MutationError, MutationResult};
use crate::form::{validate_settings, FormRecord, FormSettings, SearchProjection};
use crate::storage::Document;
use serde_json::Value;
use tracing::{info, warn};

/// Creates forms and registers users.
pub struct FormCreator {
    ctx: MutationContext,
}

impl FormCreator {
    pub fn new(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    /// Create a form owned by `author`.
    ///
    /// Settings are validated like a settings submit. The record goes to
    /// the store first, then its full projection is saved to the index.
    pub async fn create_form(
        &self,
        author: &str,
        settings: FormSettings,
    ) -> MutationResult<FormRecord> {
        let settings = settings.normalized();
        let errors = validate_settings(&settings);
        if !errors.is_empty() {
            return Err(MutationError::Validation(errors));
        }

        let record = FormRecord::new(settings).with_author(author);
        let doc = record.to_document().map_err(MutationError::StoreWrite)?;
        self.ctx
            .store
            .create(&self.ctx.collection, record.id.as_str(), doc)
            .await
            .map_err(MutationError::StoreWrite)?;
        self.ctx.publish(&record);

        let projection = SearchProjection::from_record(&record, self.ctx.mirror_collaborators);
        let saved = match projection.to_document() {
            Ok(object) => self.ctx.index.save_object(record.id.as_str(), object).await,
            Err(e) => Err(e),
        };
        if let Err(source) = saved {
            warn!(form = %record.id, error = %source, "index save failed after store commit; store and index diverged");
            return Err(MutationError::IndexWrite {
                id: record.id.clone(),
                source,
                committed: Some(Box::new(record)),
            });
        }

        info!(form = %record.id, author, "form created");
        Ok(record)
    }

    /// Register `identifier` in the users namespace.
    pub async fn add_user(&self, identifier: &str) -> MutationResult<()> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(MutationError::InvalidInput("user identifier must not be empty"));
        }

        let mut doc = Document::new();
        doc.insert("id".to_string(), Value::String(identifier.to_string()));
        self.ctx
            .store
            .create(&self.ctx.users_namespace, identifier, doc)
            .await
            .map_err(MutationError::StoreWrite)?;

        info!(user = identifier, "user registered");
        Ok(())
    }
}
