use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{DocumentDescriptor, DocumentId},
    error::ErrorBody,
    protocol::{
        ChatRequest, ChatResponse, DocumentListBody, DocumentListEntry, DocumentMetadata,
        DocumentRecord,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::error::TransportError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Remote document store and answering service.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<DocumentDescriptor>, TransportError>;
    async fn upload_document(&self, file: UploadFile)
        -> Result<DocumentDescriptor, TransportError>;
    /// Returns the answer text, `None` when the service sent none.
    async fn send_chat(&self, request: ChatRequest) -> Result<Option<String>, TransportError>;
    /// Display name for a document id the catalog does not know yet.
    async fn document_metadata(&self, id: &DocumentId) -> Result<String, TransportError>;
    /// Address the viewer fetches raw bytes from.
    fn document_locator(&self, filename: &str) -> String;
}

pub struct HttpDocumentService {
    http: Client,
    base_url: Url,
}

impl HttpDocumentService {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(server_url.trim())
            .map_err(|err| TransportError::InvalidUrl(format!("{server_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(server_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base urls, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn descriptor_from_record(&self, record: DocumentRecord) -> DocumentDescriptor {
        let locator = record
            .url
            .as_deref()
            .map(|url| match self.base_url.join(url) {
                Ok(resolved) => resolved.to_string(),
                Err(_) => url.to_string(),
            })
            .unwrap_or_else(|| self.document_locator(&record.filename));
        let updated_at = record
            .updated_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0))
            .unwrap_or_default();

        DocumentDescriptor {
            id: record.id,
            filename: record.filename,
            size_bytes: record.size,
            updated_at,
            suffix: record.suffix.unwrap_or_default(),
            preview_text: record.preview_text,
            locator,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Malformed(err.to_string()))
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .bytes()
        .await
        .ok()
        .and_then(|body| serde_json::from_slice::<ErrorBody>(&body).ok())
        .and_then(|body| body.detail_message());
    Err(TransportError::Status {
        status: status.as_u16(),
        detail,
    })
}

/// Parses a listing leniently: an unreadable body is an empty list and
/// unreadable entries are skipped.
pub fn parse_document_list(body: &[u8]) -> Vec<DocumentRecord> {
    let items = match serde_json::from_slice::<DocumentListBody>(body) {
        Ok(list) => list.into_items(),
        Err(err) => {
            warn!("catalog: unreadable document list treated as empty: {err}");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(
            |(index, item)| match serde_json::from_value::<DocumentListEntry>(item) {
                Ok(entry) => Some(DocumentRecord::from(entry)),
                Err(err) => {
                    warn!(index, "catalog: skipping malformed document entry: {err}");
                    None
                }
            },
        )
        .collect()
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn list_documents(&self) -> Result<Vec<DocumentDescriptor>, TransportError> {
        let url = self.endpoint(&["documents"]);
        debug!(%url, "catalog: fetching document list");
        let response = check_status(self.http.get(url).send().await?).await?;
        let body = response.bytes().await?;
        Ok(parse_document_list(&body)
            .into_iter()
            .map(|record| self.descriptor_from_record(record))
            .collect())
    }

    async fn upload_document(
        &self,
        file: UploadFile,
    ) -> Result<DocumentDescriptor, TransportError> {
        let url = self.endpoint(&["upload"]);
        debug!(%url, filename = %file.filename, size = file.bytes.len(), "upload: sending file");
        let mut part = multipart::Part::bytes(file.bytes).file_name(file.filename);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = multipart::Form::new().part("file", part);

        let response = self.http.post(url).multipart(form).send().await?;
        let record: DocumentRecord = Self::read_json(response).await?;
        Ok(self.descriptor_from_record(record))
    }

    async fn send_chat(&self, request: ChatRequest) -> Result<Option<String>, TransportError> {
        let url = self.endpoint(&["chat"]);
        debug!(%url, thread_id = %request.thread_id, "chat: sending message");
        let response = self.http.post(url).json(&request).send().await?;
        let body: ChatResponse = Self::read_json(response).await?;
        Ok(body.answer)
    }

    async fn document_metadata(&self, id: &DocumentId) -> Result<String, TransportError> {
        let url = self.endpoint(&["documents", id.as_str()]);
        let response = self.http.get(url).send().await?;
        let body: DocumentMetadata = Self::read_json(response).await?;
        Ok(body.filename)
    }

    fn document_locator(&self, filename: &str) -> String {
        self.endpoint(&["data", filename]).to_string()
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
