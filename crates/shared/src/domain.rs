use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(DocumentId);
id_newtype!(ThreadId);

const DOCUMENT_THREAD_PREFIX: &str = "doc:";

impl ThreadId {
    /// Canonical conversation thread for a document.
    pub fn for_document(id: &DocumentId) -> Self {
        Self(format!("{DOCUMENT_THREAD_PREFIX}{id}"))
    }

    /// A fresh thread that stays attributable to `id`, used when the user
    /// restarts the conversation without switching documents.
    pub fn restarted_for_document(id: &DocumentId, token: &str) -> Self {
        Self(format!("{DOCUMENT_THREAD_PREFIX}{id}:{token}"))
    }

    pub fn is_document_scoped(&self) -> bool {
        self.0.starts_with(DOCUMENT_THREAD_PREFIX)
    }
}

/// Lowercased last-dot segment of `filename`, dot included.
///
/// `"report.PDF"` gives `".pdf"`; a name without a dot gives an empty string.
pub fn derive_suffix(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) => filename[idx..].to_lowercase(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub id: DocumentId,
    pub filename: String,
    pub size_bytes: u64,
    pub updated_at: DateTime<Utc>,
    /// Lowercase extension, dot included; empty when the filename has none.
    pub suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_text: Option<String>,
    pub locator: String,
}

impl DocumentDescriptor {
    /// Fills in a missing suffix from the filename and case-folds a present one.
    pub fn normalized(self) -> Self {
        let suffix = if self.suffix.is_empty() {
            derive_suffix(&self.filename)
        } else {
            self.suffix.to_lowercase()
        };
        Self { suffix, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// Status line inside the conversation, e.g. a failed request.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_case_folded_last_segment() {
        assert_eq!(derive_suffix("Report.PDF"), ".pdf");
        assert_eq!(derive_suffix("archive.tar.GZ"), ".gz");
        assert_eq!(derive_suffix("notes"), "");
    }

    #[test]
    fn document_thread_ignores_filename() {
        let id = DocumentId::new("d1");
        assert_eq!(ThreadId::for_document(&id).as_str(), "doc:d1");
        assert!(ThreadId::for_document(&id).is_document_scoped());
        assert!(!ThreadId::new("4f2a9c").is_document_scoped());
    }

    #[test]
    fn normalized_derives_missing_suffix_only() {
        let doc = DocumentDescriptor {
            id: DocumentId::new("d1"),
            filename: "Invoice.PDF".to_string(),
            size_bytes: 2048,
            updated_at: DateTime::<Utc>::default(),
            suffix: String::new(),
            preview_text: None,
            locator: "http://host/data/Invoice.PDF".to_string(),
        };
        assert_eq!(doc.clone().normalized().suffix, ".pdf");

        let reported = DocumentDescriptor {
            suffix: ".TXT".to_string(),
            ..doc
        };
        assert_eq!(reported.normalized().suffix, ".txt");
    }
}
