//! Partial field sets and the search-index projection of a form

use super::record::{FormId, FormRecord, FormSettings, Response};
use crate::storage::{to_document, Document, StorageResult};
use serde::{Deserialize, Serialize};

/// The subset of record fields a single mutation touches.
///
/// One patch is encoded once and the same field set is handed to the
/// store and to the index, so the two writes cannot disagree on values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// `Some(None)` clears the redirect (serialized as `null`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_on_completion: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Response>>,
}

impl FormPatch {
    /// Every settings field, taken from one validated settings value
    pub fn settings(settings: &FormSettings) -> Self {
        Self {
            name: Some(settings.name.clone()),
            description: Some(settings.description.clone()),
            color: Some(settings.color.clone()),
            redirect_on_completion: Some(settings.redirect_on_completion.clone()),
            ..Default::default()
        }
    }

    pub fn collaborators(collaborators: Vec<String>) -> Self {
        Self {
            collaborators: Some(collaborators),
            ..Default::default()
        }
    }

    pub fn responses(responses: Vec<Response>) -> Self {
        Self {
            responses: Some(responses),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to an in-memory record
    pub fn apply_to(&self, record: &mut FormRecord) {
        if let Some(name) = &self.name {
            record.settings.name = name.clone();
        }
        if let Some(description) = &self.description {
            record.settings.description = description.clone();
        }
        if let Some(color) = &self.color {
            record.settings.color = color.clone();
        }
        if let Some(redirect) = &self.redirect_on_completion {
            record.settings.redirect_on_completion = redirect.clone();
        }
        if let Some(collaborators) = &self.collaborators {
            record.collaborators = collaborators.clone();
        }
        if let Some(responses) = &self.responses {
            record.responses = responses.clone();
        }
    }

    /// Encode as the partial field map both adapters accept
    pub fn to_fields(&self) -> StorageResult<Document> {
        to_document(self)
    }
}

/// The denormalized copy of a form held by the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProjection {
    #[serde(rename = "objectID")]
    pub object_id: FormId,
    pub name: String,
    pub description: String,
    pub color: String,
    #[serde(default)]
    pub redirect_on_completion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Response>>,
}

impl SearchProjection {
    /// Project every mirrored field of a record.
    ///
    /// Collaborators are only carried when the index mirrors them.
    pub fn from_record(record: &FormRecord, mirror_collaborators: bool) -> Self {
        Self {
            object_id: record.id.clone(),
            name: record.settings.name.clone(),
            description: record.settings.description.clone(),
            color: record.settings.color.clone(),
            redirect_on_completion: record.settings.redirect_on_completion.clone(),
            collaborators: mirror_collaborators.then(|| record.collaborators.clone()),
            responses: Some(record.responses.clone()),
        }
    }

    pub fn from_document(doc: Document) -> StorageResult<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(doc))?)
    }

    pub fn to_document(&self) -> StorageResult<Document> {
        to_document(self)
    }
}
