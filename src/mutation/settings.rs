//! Settings mutator: validate, diff, then dual-write form settings

use super::context::MutationContext;
use super::error::{MutationError, MutationResult};
use crate::form::{validate_settings, FormPatch, FormRecord, FormSettings};
use tracing::{debug, info};

/// Applies a proposed settings form to a record.
pub struct SettingsMutator {
    ctx: MutationContext,
}

impl SettingsMutator {
    pub fn new(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    /// Submit proposed settings against the caller's current view.
    ///
    /// Rejects invalid fields with `Validation` and unchanged settings with
    /// `NoChange`, in both cases before any write. Otherwise writes the full
    /// settings set to the store, then to the index, and returns the next
    /// state of the record.
    ///
    /// The write happens under the record's lock and the result is built on
    /// a fresh store read, so fields changed by other actions since the
    /// caller's view was taken are kept.
    pub async fn submit(
        &self,
        current: &FormRecord,
        proposed: FormSettings,
    ) -> MutationResult<FormRecord> {
        let proposed = proposed.normalized();

        let errors = validate_settings(&proposed);
        if !errors.is_empty() {
            debug!(form = %current.id, fields = errors.len(), "settings rejected by validation");
            return Err(MutationError::Validation(errors));
        }

        if proposed == current.settings.clone().normalized() {
            debug!(form = %current.id, "settings unchanged; nothing written");
            return Err(MutationError::NoChange);
        }

        let _guard = self.ctx.locks.lock(&current.id).await;
        let mut next = self.ctx.read_form(&current.id).await?;

        let patch = FormPatch::settings(&proposed);
        patch.apply_to(&mut next);

        self.ctx.dual_write(&current.id, &patch, &next).await?;

        info!(form = %current.id, "settings updated");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormId, SearchProjection, SettingsField};
    use crate::mutation::context::test_support::memory_context;
    use crate::storage::{DocumentStore, SearchIndex};

    async fn seeded() -> (
        SettingsMutator,
        FormRecord,
        std::sync::Arc<crate::storage::MemoryStore>,
        std::sync::Arc<crate::mutation::context::test_support::FlakyIndex>,
    ) {
        let (ctx, store, index) = memory_context();
        let record = FormRecord::with_id(
            FormId::from_string("form-1"),
            FormSettings::new("A", "d", "#fff"),
        );
        store
            .create("forms", "form-1", record.to_document().unwrap())
            .await
            .unwrap();
        index
            .save_object(
                "form-1",
                SearchProjection::from_record(&record, true).to_document().unwrap(),
            )
            .await
            .unwrap();
        (SettingsMutator::new(ctx), record, store, index)
    }

    // === Scenario: identical settings are rejected without writes ===
    #[tokio::test]
    async fn identical_settings_rejected_with_no_writes() {
        let (mutator, record, store, index) = seeded().await;
        let store_writes = store.write_count();
        let index_writes = index.inner.write_count();

        let err = mutator
            .submit(&record, FormSettings::new("A", "d", "#fff"))
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::NoChange));
        assert_eq!(store.write_count(), store_writes);
        assert_eq!(index.inner.write_count(), index_writes);
    }

    #[tokio::test]
    async fn blank_redirect_equals_absent_redirect() {
        let (mutator, record, _store, _index) = seeded().await;

        let err = mutator
            .submit(&record, FormSettings::new("A", "d", "#fff").with_redirect(""))
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::NoChange));
    }

    #[tokio::test]
    async fn invalid_fields_rejected_before_writes() {
        let (mutator, record, store, _index) = seeded().await;
        let store_writes = store.write_count();

        let err = mutator
            .submit(&record, FormSettings::new("", "d", "blue").with_redirect("nope"))
            .await
            .unwrap_err();

        let fields: Vec<_> = err.field_errors().iter().map(|f| f.field).collect();
        assert_eq!(
            fields,
            vec![SettingsField::Name, SettingsField::Color, SettingsField::RedirectOnCompletion]
        );
        assert_eq!(store.write_count(), store_writes);
    }

    // === Scenario: genuine change lands in store and index with identical values ===
    #[tokio::test]
    async fn change_written_to_store_and_index() {
        let (mutator, record, store, index) = seeded().await;
        let proposed = FormSettings::new("B", "new description", "#123456")
            .with_redirect("https://example.com/thanks");

        let next = mutator.submit(&record, proposed.clone()).await.unwrap();
        assert_eq!(next.settings, proposed);

        let stored = store.read("forms", "form-1").await.unwrap().unwrap();
        let indexed = index.get_object("form-1").await.unwrap().unwrap();
        for key in ["name", "description", "color", "redirectOnCompletion"] {
            assert_eq!(stored[key], indexed[key], "{key} diverged");
        }
        assert_eq!(stored["name"], serde_json::json!("B"));
    }

    #[tokio::test]
    async fn resubmitting_returned_state_is_no_change() {
        let (mutator, record, _store, _index) = seeded().await;
        let proposed = FormSettings::new("B", "d", "#fff");

        let next = mutator.submit(&record, proposed.clone()).await.unwrap();
        let err = mutator.submit(&next, proposed).await.unwrap_err();

        assert!(matches!(err, MutationError::NoChange));
    }

    // === Scenario: index failure after store commit is reported, not rolled back ===
    #[tokio::test]
    async fn index_failure_reports_divergence_and_keeps_store_write() {
        let (mutator, record, store, index) = seeded().await;
        index.fail_writes();

        let err = mutator
            .submit(&record, FormSettings::new("B", "d", "#fff"))
            .await
            .unwrap_err();

        assert!(err.is_divergent());
        match &err {
            MutationError::IndexWrite { committed, .. } => {
                assert_eq!(committed.as_ref().unwrap().name(), "B");
            }
            other => panic!("expected IndexWrite, got {other:?}"),
        }

        let stored = store.read("forms", "form-1").await.unwrap().unwrap();
        assert_eq!(stored["name"], serde_json::json!("B"));
        let indexed = index.get_object("form-1").await.unwrap().unwrap();
        assert_eq!(indexed["name"], serde_json::json!("A"));
    }

    #[tokio::test]
    async fn missing_record_is_not_found_without_writes() {
        let (ctx, store, index) = memory_context();
        let mutator = SettingsMutator::new(ctx);
        let ghost = FormRecord::with_id(FormId::from_string("ghost"), FormSettings::new("A", "d", "#fff"));

        let err = mutator
            .submit(&ghost, FormSettings::new("B", "d", "#fff"))
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::NotFound(_)));
        assert_eq!(store.write_count(), 0);
        assert!(index.get_object("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn result_keeps_fields_changed_since_callers_view() {
        let (mutator, record, store, _index) = seeded().await;
        let mut fields = crate::storage::Document::new();
        fields.insert("collaborators".into(), serde_json::json!(["bob"]));
        store.update("forms", "form-1", fields).await.unwrap();

        let next = mutator
            .submit(&record, FormSettings::new("B", "d", "#fff"))
            .await
            .unwrap();

        assert_eq!(next.name(), "B");
        assert_eq!(next.collaborators, vec!["bob"]);
        assert_eq!(mutator.ctx.snapshots.get(&record.id).unwrap(), next);
    }

    #[tokio::test]
    async fn submit_waits_for_record_lock() {
        let (mutator, record, store, _index) = seeded().await;
        let held = mutator.ctx.locks.lock(&record.id).await;
        let writes = store.write_count();

        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            mutator.submit(&record, FormSettings::new("B", "d", "#fff")),
        )
        .await;

        assert!(pending.is_err(), "submit must wait for the record lock");
        assert_eq!(store.write_count(), writes);
        drop(held);
        mutator
            .submit(&record, FormSettings::new("B", "d", "#fff"))
            .await
            .unwrap();
    }
}
