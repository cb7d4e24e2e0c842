//! Fakes shared by the controller test suites.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{ChatEntry, DocumentDescriptor, DocumentId, ThreadId},
    protocol::ChatRequest,
};
use tokio::sync::{oneshot, Mutex};

use crate::{
    error::TransportError,
    notifications::Notification,
    preview::Preview,
    transport::{DocumentService, UploadFile},
    view::ControllerView,
};

pub fn doc(id: &str, filename: &str) -> DocumentDescriptor {
    DocumentDescriptor {
        id: DocumentId::new(id),
        filename: filename.to_string(),
        size_bytes: 2048,
        updated_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        suffix: shared::domain::derive_suffix(filename),
        preview_text: None,
        locator: format!("http://127.0.0.1:8000/data/{filename}"),
    }
}

#[derive(Default)]
pub struct RecordingView {
    pub notifications: StdMutex<Vec<Notification>>,
    pub previews: StdMutex<Vec<Preview>>,
    pub histories: StdMutex<Vec<(ThreadId, Vec<ChatEntry>)>>,
    pub catalogs: StdMutex<Vec<(Vec<DocumentId>, Option<DocumentId>)>>,
    pub upload_enabled: StdMutex<Vec<bool>>,
    pub awaiting: StdMutex<Vec<bool>>,
    pub file_selection_clears: AtomicUsize,
    pub input_clears: AtomicUsize,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.notifications.lock().expect("view lock").last().cloned()
    }

    pub fn last_preview(&self) -> Option<Preview> {
        self.previews.lock().expect("view lock").last().cloned()
    }

    pub fn last_history(&self) -> Option<(ThreadId, Vec<ChatEntry>)> {
        self.histories.lock().expect("view lock").last().cloned()
    }
}

impl ControllerView for RecordingView {
    fn show_notification(&self, notification: &Notification) {
        self.notifications
            .lock()
            .expect("view lock")
            .push(notification.clone());
    }

    fn show_preview(&self, _document: Option<&DocumentDescriptor>, preview: &Preview) {
        self.previews.lock().expect("view lock").push(preview.clone());
    }

    fn show_catalog(&self, catalog: &[DocumentDescriptor], active: Option<&DocumentId>) {
        self.catalogs.lock().expect("view lock").push((
            catalog.iter().map(|doc| doc.id.clone()).collect(),
            active.cloned(),
        ));
    }

    fn show_history(&self, thread_id: &ThreadId, history: &[ChatEntry]) {
        self.histories
            .lock()
            .expect("view lock")
            .push((thread_id.clone(), history.to_vec()));
    }

    fn set_upload_enabled(&self, enabled: bool) {
        self.upload_enabled.lock().expect("view lock").push(enabled);
    }

    fn clear_file_selection(&self) {
        self.file_selection_clears.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_message_input(&self) {
        self.input_clears.fetch_add(1, Ordering::SeqCst);
    }

    fn set_awaiting_response(&self, awaiting: bool) {
        self.awaiting.lock().expect("view lock").push(awaiting);
    }
}

type Gate = oneshot::Receiver<()>;

/// In-memory document service. Responses are scripted per call and may be
/// held back behind a gate so tests can control arrival order.
pub struct FakeDocumentService {
    pub catalog: Mutex<Result<Vec<DocumentDescriptor>, u16>>,
    pub upload_results: Mutex<VecDeque<Result<DocumentDescriptor, TransportError>>>,
    pub upload_gate: Mutex<Option<Gate>>,
    pub uploads: StdMutex<Vec<UploadFile>>,
    pub chat_answers: Mutex<HashMap<String, Result<Option<String>, TransportError>>>,
    pub chat_gates: Mutex<HashMap<String, Gate>>,
    pub chats: StdMutex<Vec<ChatRequest>>,
    pub metadata: Mutex<HashMap<DocumentId, String>>,
    pub list_calls: AtomicUsize,
}

impl FakeDocumentService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            catalog: Mutex::new(Ok(Vec::new())),
            upload_results: Mutex::new(VecDeque::new()),
            upload_gate: Mutex::new(None),
            uploads: StdMutex::new(Vec::new()),
            chat_answers: Mutex::new(HashMap::new()),
            chat_gates: Mutex::new(HashMap::new()),
            chats: StdMutex::new(Vec::new()),
            metadata: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub async fn set_catalog(&self, docs: Vec<DocumentDescriptor>) {
        *self.catalog.lock().await = Ok(docs);
    }

    pub async fn fail_catalog(&self, status: u16) {
        *self.catalog.lock().await = Err(status);
    }

    pub async fn push_upload_result(&self, result: Result<DocumentDescriptor, TransportError>) {
        self.upload_results.lock().await.push_back(result);
    }

    /// Holds the next upload until the returned sender fires.
    pub async fn gate_upload(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.upload_gate.lock().await = Some(rx);
        tx
    }

    pub async fn answer(&self, message: &str, result: Result<Option<String>, TransportError>) {
        self.chat_answers
            .lock()
            .await
            .insert(message.to_string(), result);
    }

    /// Holds the answer to `message` until the returned sender fires.
    pub async fn gate_chat(&self, message: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.chat_gates.lock().await.insert(message.to_string(), rx);
        tx
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chats.lock().expect("fake lock").clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().expect("fake lock").len()
    }
}

#[async_trait]
impl DocumentService for FakeDocumentService {
    async fn list_documents(&self) -> Result<Vec<DocumentDescriptor>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.catalog.lock().await {
            Ok(docs) => Ok(docs.clone()),
            Err(status) => Err(TransportError::Status {
                status: *status,
                detail: None,
            }),
        }
    }

    async fn upload_document(
        &self,
        file: UploadFile,
    ) -> Result<DocumentDescriptor, TransportError> {
        self.uploads.lock().expect("fake lock").push(file);
        let gate = self.upload_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.upload_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted upload".to_string())))
    }

    async fn send_chat(&self, request: ChatRequest) -> Result<Option<String>, TransportError> {
        self.chats.lock().expect("fake lock").push(request.clone());
        let gate = self.chat_gates.lock().await.remove(&request.message);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.chat_answers
            .lock()
            .await
            .remove(&request.message)
            .unwrap_or_else(|| Ok(Some(format!("echo: {}", request.message))))
    }

    async fn document_metadata(&self, id: &DocumentId) -> Result<String, TransportError> {
        self.metadata
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or(TransportError::Status {
                status: 404,
                detail: Some("Document not found".to_string()),
            })
    }

    fn document_locator(&self, filename: &str) -> String {
        format!("http://127.0.0.1:8000/data/{filename}")
    }
}
