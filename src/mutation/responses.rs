//! Response collection mutator: record and delete submitted responses

use super::context::MutationContext;
use super::error::{MutationError, MutationResult};
use crate::form::{Answer, FormPatch, FormRecord, Response};
use tracing::{debug, info};

/// Drop every response whose `idResponse` equals `id_response`, keeping the
/// order and content of the rest.
pub fn without_response(responses: &[Response], id_response: &str) -> Vec<Response> {
    responses
        .iter()
        .filter(|r| r.id_response != id_response)
        .cloned()
        .collect()
}

/// Mutates the `responses` list of a record.
pub struct ResponseMutator {
    ctx: MutationContext,
}

impl ResponseMutator {
    pub fn new(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    /// Delete a response by id.
    ///
    /// Deleting an id the record does not hold succeeds with the record
    /// unchanged and writes nothing. Otherwise the filtered list is written
    /// to the store, then pushed to the index.
    pub async fn delete_response(
        &self,
        current: &FormRecord,
        id_response: &str,
    ) -> MutationResult<FormRecord> {
        if id_response.is_empty() {
            return Err(MutationError::InvalidInput("response id must not be empty"));
        }

        let _guard = self.ctx.locks.lock(&current.id).await;
        let mut next = self.ctx.read_form(&current.id).await?;

        let remaining = without_response(&next.responses, id_response);
        if remaining.len() == next.responses.len() {
            debug!(form = %current.id, response = id_response, "response not present; nothing written");
            self.ctx.publish(&next);
            return Ok(next);
        }

        let patch = FormPatch::responses(remaining);
        patch.apply_to(&mut next);
        self.ctx.dual_write(&current.id, &patch, &next).await?;

        info!(form = %current.id, response = id_response, "response deleted");
        Ok(next)
    }

    /// Append a new response with a fresh id and the current time.
    pub async fn record_response(
        &self,
        current: &FormRecord,
        answers: Vec<Answer>,
    ) -> MutationResult<(FormRecord, Response)> {
        let response = Response::new(answers);

        let _guard = self.ctx.locks.lock(&current.id).await;
        let mut next = self.ctx.read_form(&current.id).await?;

        let mut responses = next.responses.clone();
        responses.push(response.clone());
        let patch = FormPatch::responses(responses);
        patch.apply_to(&mut next);
        self.ctx.dual_write(&current.id, &patch, &next).await?;

        info!(form = %current.id, response = %response.id_response, "response recorded");
        Ok((next, response))
    }
}
