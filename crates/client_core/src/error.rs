use shared::domain::DocumentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{}", describe_status(.status, .detail))]
    Status { status: u16, detail: Option<String> },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Text shown to the user: the server's detail when it sent one.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn describe_status(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("HTTP {status}"),
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("file '{0}' is empty")]
    EmptyFile(String),
    #[error("an upload is already in progress")]
    AlreadyInFlight,
    #[error("upload failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no document selected")]
    NoActiveDocument,
    #[error("message failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("unknown document {0}")]
    UnknownDocument(DocumentId),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
