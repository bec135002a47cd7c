//! FormRecord: the primary document a form is stored as

use crate::storage::{to_document, Document, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a form
///
/// Serializes as a plain string. Used both as the document id in the
/// primary store and as the `objectID` in the search index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    /// Create a new random FormId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a FormId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FormId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FormId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One answered question inside a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub label: String,
    pub text: String,
}

impl Answer {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A single submission collected by a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Unique within the owning record's response list
    pub id_response: String,
    pub created_at: DateTime<Utc>,
    /// Answers in question order
    pub responses: Vec<Answer>,
}

impl Response {
    /// Create a response stamped with a fresh id and the current time
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            id_response: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            responses: answers,
        }
    }

    /// Create a response with a caller-chosen id
    pub fn with_id(id_response: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self {
            id_response: id_response.into(),
            created_at: Utc::now(),
            responses: answers,
        }
    }
}

/// The user-editable settings of a form
///
/// These are exactly the fields the settings mutator diffs and writes,
/// and all of them are mirrored into the search projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSettings {
    pub name: String,
    pub description: String,
    pub color: String,
    #[serde(default)]
    pub redirect_on_completion: Option<String>,
}

impl FormSettings {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            color: color.into(),
            redirect_on_completion: None,
        }
    }

    pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
        self.redirect_on_completion = Some(url.into());
        self
    }

    /// A blank redirect means "no redirect"; collapse it to `None`.
    pub fn normalized(mut self) -> Self {
        if self
            .redirect_on_completion
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            self.redirect_on_completion = None;
        }
        self
    }
}

/// A form as stored in the primary document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub id: FormId,
    /// Creator of the form
    #[serde(default)]
    pub id_author: Option<String>,
    #[serde(flatten)]
    pub settings: FormSettings,
    /// User identifiers allowed to manage the form. No duplicates.
    #[serde(default)]
    pub collaborators: Vec<String>,
    /// Oldest first
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl FormRecord {
    /// Create a new record with a random id
    pub fn new(settings: FormSettings) -> Self {
        Self::with_id(FormId::new(), settings)
    }

    /// Create a new record with a specific id
    pub fn with_id(id: FormId, settings: FormSettings) -> Self {
        Self {
            id,
            id_author: None,
            settings: settings.normalized(),
            collaborators: Vec::new(),
            responses: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.id_author = Some(author.into());
        self
    }

    pub fn with_collaborator(mut self, user: impl Into<String>) -> Self {
        let user = user.into();
        if !self.has_collaborator(&user) {
            self.collaborators.push(user);
        }
        self
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.responses.push(response);
        self
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn has_collaborator(&self, user: &str) -> bool {
        self.collaborators.iter().any(|c| c == user)
    }

    pub fn get_response(&self, id_response: &str) -> Option<&Response> {
        self.responses.iter().find(|r| r.id_response == id_response)
    }

    /// Responses in display order (newest first)
    pub fn responses_newest_first(&self) -> impl Iterator<Item = &Response> {
        self.responses.iter().rev()
    }

    /// Decode a record from a raw store document
    pub fn from_document(doc: Document) -> StorageResult<Self> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }

    /// Encode this record as a raw store document
    pub fn to_document(&self) -> StorageResult<Document> {
        to_document(self)
    }
}
