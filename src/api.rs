//! Transport-independent API layer.
//!
//! `FormsApi` is the single entry point for callers. It serves the shared
//! snapshot of each form, owns the per-action status flags, and routes every
//! write through the mutators. Transports (the CLI, an HTTP handler, direct
//! embedding) call `FormsApi` methods and never reach into the mutators or
//! adapters directly.

use std::sync::Arc;

use tracing::warn;

use crate::config::FormsConfig;
use crate::form::{Answer, FormId, FormRecord, FormSettings, Response, SearchProjection};
use crate::mutation::{
    CollaboratorMutator, DeletionWorkflow, FormCreator, InFlight, Membership, MutationContext,
    MutationError, MutationKind, MutationResult, MutationStatus, Navigation, ResponseMutator,
    SettingsMutator, StatusBoard,
};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::storage::{
    DocumentStore, IdentityChecker, OpenStore, SearchIndex, SqliteIndex, SqliteStore,
    StorageResult,
};

/// Single entry point for all caller-facing operations.
pub struct FormsApi {
    ctx: MutationContext,
    settings: SettingsMutator,
    collaborators: CollaboratorMutator,
    responses: ResponseMutator,
    deletion: DeletionWorkflow,
    creator: FormCreator,
    reconciler: Reconciler,
    statuses: StatusBoard,
    creation: MutationStatus,
}

impl FormsApi {
    /// Create an API over a mutation context.
    pub fn new(ctx: MutationContext) -> Self {
        Self {
            settings: SettingsMutator::new(ctx.clone()),
            collaborators: CollaboratorMutator::new(ctx.clone()),
            responses: ResponseMutator::new(ctx.clone()),
            deletion: DeletionWorkflow::new(ctx.clone()),
            creator: FormCreator::new(ctx.clone()),
            reconciler: Reconciler::new(ctx.clone()),
            statuses: StatusBoard::new(),
            creation: MutationStatus::new(),
            ctx,
        }
    }

    /// Create an API over explicit adapters with default layout.
    pub fn with_adapters(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
        identity: Arc<dyn IdentityChecker>,
    ) -> Self {
        Self::new(MutationContext::new(store, index, identity))
    }

    /// Open the SQLite store and index named by a config.
    pub fn open(config: &FormsConfig) -> StorageResult<Self> {
        let store = Arc::new(SqliteStore::open(config.store_path())?);
        let index = Arc::new(SqliteIndex::open(config.index_path(), config.index_name.clone())?);
        let ctx = MutationContext::new(store.clone(), index, store)
            .with_collection(config.collection.clone())
            .with_users_namespace(config.users_namespace.clone())
            .with_mirror_collaborators(config.mirror_collaborators);
        Ok(Self::new(ctx))
    }

    pub fn context(&self) -> &MutationContext {
        &self.ctx
    }

    // --- Reads ---

    /// The caller's current view of a form, loading it on first use.
    pub async fn get_form(&self, id: &FormId) -> MutationResult<FormRecord> {
        match self.ctx.snapshots.get(id) {
            Some(record) => Ok(record),
            None => self.refresh(id).await,
        }
    }

    /// Re-read a form from the store and publish it as the current view.
    ///
    /// A mutation that completes while the read is in flight wins.
    pub async fn refresh(&self, id: &FormId) -> MutationResult<FormRecord> {
        let ticket = self.ctx.snapshots.ticket();
        match self.ctx.read_form(id).await {
            Ok(record) => {
                self.ctx.snapshots.publish(record.clone(), ticket);
                Ok(record)
            }
            Err(e) => {
                self.evict_missing(&e);
                Err(e)
            }
        }
    }

    /// Every stored form, ordered by id
    pub async fn list_forms(&self) -> MutationResult<Vec<FormRecord>> {
        let docs = self
            .ctx
            .store
            .list(&self.ctx.collection)
            .await
            .map_err(MutationError::StoreRead)?;
        docs.into_iter()
            .map(|(_, doc)| FormRecord::from_document(doc).map_err(MutationError::StoreRead))
            .collect()
    }

    /// Forms whose indexed name or description contains `query`
    pub async fn search(&self, query: &str) -> StorageResult<Vec<SearchProjection>> {
        let hits = self.ctx.index.search(query).await?;
        Ok(hits
            .into_iter()
            .filter_map(|doc| match SearchProjection::from_document(doc) {
                Ok(projection) => Some(projection),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable index object");
                    None
                }
            })
            .collect())
    }

    // --- Status ---

    /// Status flags of an action on a form
    pub fn status(&self, kind: MutationKind, id: &FormId) -> MutationStatus {
        self.statuses.get(kind, id)
    }

    /// Status flags of form creation
    pub fn creation_status(&self) -> MutationStatus {
        self.creation.clone()
    }

    /// Start `kind` on a form, refusing while `kind` or `shared_with` is
    /// outstanding. Settings and collaborator edits share one page and are
    /// never in flight together.
    fn begin_exclusive(
        &self,
        kind: MutationKind,
        shared_with: MutationKind,
        id: &FormId,
    ) -> MutationResult<InFlight> {
        let flight = self.statuses.get(kind, id).begin(kind)?;
        if self.statuses.get(shared_with, id).is_loading() {
            let busy: MutationResult<()> = Err(MutationError::Busy(shared_with));
            flight.finish(&busy);
            return Err(MutationError::Busy(shared_with));
        }
        Ok(flight)
    }

    // --- Writes ---

    pub async fn create_form(
        &self,
        author: &str,
        settings: FormSettings,
    ) -> MutationResult<FormRecord> {
        let flight = self.creation.begin(MutationKind::FormCreation)?;
        let result = self.creator.create_form(author, settings).await;
        flight.finish(&result);
        result
    }

    pub async fn add_user(&self, identifier: &str) -> MutationResult<()> {
        self.creator.add_user(identifier).await
    }

    pub async fn submit_settings(
        &self,
        id: &FormId,
        proposed: FormSettings,
    ) -> MutationResult<FormRecord> {
        let flight =
            self.begin_exclusive(MutationKind::Settings, MutationKind::Collaborators, id)?;
        let result = match self.get_form(id).await {
            Ok(current) => self.settings.submit(&current, proposed).await,
            Err(e) => Err(e),
        };
        self.evict_on_err(&result);
        flight.finish(&result);
        result
    }

    pub async fn toggle_collaborator(
        &self,
        id: &FormId,
        user: &str,
    ) -> MutationResult<(FormRecord, Membership)> {
        let flight =
            self.begin_exclusive(MutationKind::Collaborators, MutationKind::Settings, id)?;
        let result = match self.get_form(id).await {
            Ok(current) => self.collaborators.toggle(&current, user).await,
            Err(e) => Err(e),
        };
        self.evict_on_err(&result);
        flight.finish(&result);
        result
    }

    pub async fn delete_response(
        &self,
        id: &FormId,
        id_response: &str,
    ) -> MutationResult<FormRecord> {
        let flight = self
            .statuses
            .get(MutationKind::ResponseDeletion, id)
            .begin(MutationKind::ResponseDeletion)?;
        let result = match self.get_form(id).await {
            Ok(current) => self.responses.delete_response(&current, id_response).await,
            Err(e) => Err(e),
        };
        self.evict_on_err(&result);
        flight.finish(&result);
        result
    }

    pub async fn record_response(
        &self,
        id: &FormId,
        answers: Vec<Answer>,
    ) -> MutationResult<Response> {
        let flight = self
            .statuses
            .get(MutationKind::ResponseSubmission, id)
            .begin(MutationKind::ResponseSubmission)?;
        let result = match self.get_form(id).await {
            Ok(current) => self
                .responses
                .record_response(&current, answers)
                .await
                .map(|(_, response)| response),
            Err(e) => Err(e),
        };
        self.evict_on_err(&result);
        flight.finish(&result);
        result
    }

    /// Delete a form once `confirmation` matches its current name.
    pub async fn delete_form(&self, id: &FormId, confirmation: &str) -> MutationResult<Navigation> {
        let flight = self
            .statuses
            .get(MutationKind::FormDeletion, id)
            .begin(MutationKind::FormDeletion)?;
        let result = match self.get_form(id).await {
            Ok(current) => {
                self.deletion
                    .delete_form(id, confirmation, current.name())
                    .await
            }
            Err(e) => Err(e),
        };
        if matches!(result, Ok(_) | Err(MutationError::IndexDelete { .. })) {
            self.ctx.snapshots.evict(id);
        }
        flight.finish(&result);
        result
    }

    /// Repair the index from the store
    pub async fn reconcile(&self) -> StorageResult<ReconcileReport> {
        self.reconciler.sweep().await
    }

    fn evict_on_err<T>(&self, result: &MutationResult<T>) {
        if let Err(e) = result {
            self.evict_missing(e);
        }
    }

    /// A form the store no longer holds has no current view.
    fn evict_missing(&self, error: &MutationError) {
        if let MutationError::NotFound(id) = error {
            self.ctx.snapshots.evict(id);
        }
    }
}
