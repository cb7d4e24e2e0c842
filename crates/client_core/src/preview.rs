//! Maps the active document to what the viewer should render.

use shared::domain::DocumentDescriptor;

pub const NO_PREVIEW_PLACEHOLDER: &str = "No preview available.";

const PAGED_SUFFIX: &str = ".pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    Paged,
    Text,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Paginated viewer pointed at the document's locator.
    Paged { locator: String },
    Text { text: String },
    Empty,
}

impl Preview {
    pub fn mode(&self) -> PreviewMode {
        match self {
            Preview::Paged { .. } => PreviewMode::Paged,
            Preview::Text { .. } => PreviewMode::Text,
            Preview::Empty => PreviewMode::Empty,
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Preview::Paged { locator } => Some(locator),
            Preview::Text { text } => Some(text),
            Preview::Empty => None,
        }
    }
}

pub fn resolve(doc: Option<&DocumentDescriptor>) -> Preview {
    let Some(doc) = doc else {
        return Preview::Empty;
    };

    if doc.suffix == PAGED_SUFFIX {
        return Preview::Paged {
            locator: doc.locator.clone(),
        };
    }

    Preview::Text {
        text: doc
            .preview_text
            .clone()
            .unwrap_or_else(|| NO_PREVIEW_PLACEHOLDER.to_string()),
    }
}
