use serde::{Deserialize, Serialize};

use crate::domain::{DocumentId, ThreadId};

/// A document as listed or returned by the document service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    /// Seconds since the epoch; some servers report fractional mtimes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(
        default,
        alias = "preview",
        skip_serializing_if = "Option::is_none"
    )]
    pub preview_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DocumentRecord {
    /// Record for a legacy listing entry that only carried a filename.
    pub fn from_filename(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            id: DocumentId::new(filename.clone()),
            filename,
            size: 0,
            updated_at: None,
            suffix: None,
            preview_text: None,
            url: None,
        }
    }
}

/// One entry of a document listing: a full record or a bare filename.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentListEntry {
    Record(DocumentRecord),
    Filename(String),
}

impl From<DocumentListEntry> for DocumentRecord {
    fn from(value: DocumentListEntry) -> Self {
        match value {
            DocumentListEntry::Record(record) => record,
            DocumentListEntry::Filename(filename) => DocumentRecord::from_filename(filename),
        }
    }
}

/// Listing body. Items stay raw so one bad entry does not sink the list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentListBody {
    Wrapped {
        #[serde(default)]
        documents: Vec<serde_json::Value>,
    },
    Bare(Vec<serde_json::Value>),
}

impl DocumentListBody {
    pub fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            DocumentListBody::Wrapped { documents } => documents,
            DocumentListBody::Bare(items) => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub thread_id: ThreadId,
    pub document_id: Option<DocumentId>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
}
