// Core domain types shared across noteedit crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque document identifier assigned by the backend.
///
/// Backends may send the identifier as a JSON string or a JSON number; both
/// are carried as text and always serialized back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawDocumentId", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocumentId {
    Text(String),
    Integer(i64),
}

impl From<RawDocumentId> for DocumentId {
    fn from(raw: RawDocumentId) -> Self {
        match raw {
            RawDocumentId::Text(text) => Self(text),
            RawDocumentId::Integer(number) => Self(number.to_string()),
        }
    }
}

/// A remote document as materialized locally: identity, display title and
/// text body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Body text. Older backends name this field `contentMarkdown`.
    #[serde(alias = "contentMarkdown")]
    pub content: String,
}
