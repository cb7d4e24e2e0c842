use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use shared::domain::{derive_suffix, ChatEntry, DocumentDescriptor, DocumentId, ThreadId};
use tracing::{info, warn};

pub mod conversation;
pub mod error;
pub mod ids;
pub mod notifications;
pub mod preview;
pub mod session;
pub mod transport;
pub mod upload;
pub mod view;

pub use conversation::{ConversationChannel, SendOutcome};
pub use error::{ControllerError, SendError, TransportError, UploadError};
pub use ids::{RandomThreadIds, SequentialThreadIds, ThreadIdGenerator};
pub use notifications::{Notification, NotificationCenter, ShowOptions, DEFAULT_NOTICE_TTL};
pub use preview::{Preview, PreviewMode};
pub use session::{SessionSnapshot, SessionStore, SessionTransition, SharedSession};
pub use transport::{DocumentService, HttpDocumentService, UploadFile, DEFAULT_REQUEST_TIMEOUT};
pub use upload::{UploadCoordinator, UploadPhase, DEFAULT_SUCCESS_TTL};
pub use view::{ControllerView, HeadlessView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Reject chat messages while no document is active.
    pub require_document: bool,
    pub notice_ttl: Duration,
    pub success_ttl: Duration,
    /// Activate the most recent catalog entry at start when no initial
    /// document was requested.
    pub auto_select_latest: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            require_document: false,
            notice_ttl: DEFAULT_NOTICE_TTL,
            success_ttl: DEFAULT_SUCCESS_TTL,
            auto_select_latest: false,
        }
    }
}

/// Document session controller for a chat-over-documents front-end.
///
/// Owns the session, the upload coordinator and the conversation channel,
/// and talks to the outside world only through the injected
/// [`DocumentService`] and [`ControllerView`].
pub struct DocumentChat {
    service: Arc<dyn DocumentService>,
    notifications: Arc<NotificationCenter>,
    session: Arc<SharedSession>,
    uploads: UploadCoordinator,
    conversation: ConversationChannel,
    options: ControllerOptions,
}

impl DocumentChat {
    pub fn new(
        service: Arc<dyn DocumentService>,
        view: Arc<dyn ControllerView>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        Self::new_with_dependencies(service, view, Arc::new(RandomThreadIds), options)
    }

    pub fn new_with_dependencies(
        service: Arc<dyn DocumentService>,
        view: Arc<dyn ControllerView>,
        ids: Arc<dyn ThreadIdGenerator>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let notifications = NotificationCenter::new(view.clone(), options.notice_ttl);
        let session = SharedSession::new(
            SessionStore::new(ids),
            notifications.clone(),
            view.clone(),
        );
        let uploads = UploadCoordinator::new(
            service.clone(),
            session.clone(),
            notifications.clone(),
            view.clone(),
            options.success_ttl,
        );
        let conversation = ConversationChannel::new(
            service.clone(),
            session.clone(),
            notifications.clone(),
            view,
            options.require_document,
        );
        Arc::new(Self {
            service,
            notifications,
            session,
            uploads,
            conversation,
            options,
        })
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    /// Loads the catalog, then opens `initial` if given. Without an initial
    /// document the newest catalog entry is selected when
    /// `auto_select_latest` is set.
    pub async fn start(&self, initial: Option<DocumentId>) -> Result<(), ControllerError> {
        let loaded = self.refresh_catalog().await;
        match initial {
            Some(id) => {
                self.open_document(&id).await?;
            }
            None if self.options.auto_select_latest => {
                if let Some(latest) = self.session.catalog().await.into_iter().next() {
                    self.session.set_active_document(Some(latest)).await;
                }
            }
            None => {}
        }
        loaded.map(|_| ())
    }

    /// Replaces the catalog with the service's listing. On failure the
    /// current catalog is kept.
    pub async fn refresh_catalog(&self) -> Result<usize, ControllerError> {
        match self.service.list_documents().await {
            Ok(documents) => {
                let documents: Vec<DocumentDescriptor> = documents
                    .into_iter()
                    .map(DocumentDescriptor::normalized)
                    .collect();
                self.session.replace_catalog(documents).await;
                let count = self.session.catalog().await.len();
                info!(count, "catalog: refreshed");
                Ok(count)
            }
            Err(err) => {
                warn!("catalog: refresh failed: {err}");
                self.notifications
                    .show(
                        format!("Could not load documents: {}", err.user_message()),
                        ShowOptions::persistent_error(),
                    )
                    .await;
                Err(err.into())
            }
        }
    }

    /// Activates a catalog entry.
    pub async fn select_document(
        &self,
        id: &DocumentId,
    ) -> Result<DocumentDescriptor, ControllerError> {
        let Some(document) = self.session.find(id).await else {
            warn!(%id, "session: unknown document");
            self.notifications
                .show(
                    format!("Unknown document: {id}"),
                    ShowOptions::persistent_error(),
                )
                .await;
            return Err(ControllerError::UnknownDocument(id.clone()));
        };
        self.session.set_active_document(Some(document.clone())).await;
        Ok(document)
    }

    /// Like [`select_document`](Self::select_document), but falls back to the
    /// service's metadata lookup for ids missing from the catalog.
    pub async fn open_document(
        &self,
        id: &DocumentId,
    ) -> Result<DocumentDescriptor, ControllerError> {
        if let Some(document) = self.session.find(id).await {
            self.session.set_active_document(Some(document.clone())).await;
            return Ok(document);
        }

        match self.service.document_metadata(id).await {
            Ok(filename) => {
                let document = DocumentDescriptor {
                    id: id.clone(),
                    suffix: derive_suffix(&filename),
                    locator: self.service.document_locator(&filename),
                    filename,
                    size_bytes: 0,
                    updated_at: DateTime::<Utc>::default(),
                    preview_text: None,
                };
                self.session.set_active_document(Some(document.clone())).await;
                Ok(document)
            }
            Err(err) => {
                warn!(%id, "session: metadata lookup failed: {err}");
                self.notifications
                    .show(
                        format!("Could not open document {id}: {}", err.user_message()),
                        ShowOptions::persistent_error(),
                    )
                    .await;
                Err(err.into())
            }
        }
    }

    pub async fn clear_selection(&self) -> bool {
        self.session.set_active_document(None).await
    }

    pub async fn upload(&self, file: Option<UploadFile>) -> Result<DocumentDescriptor, UploadError> {
        self.uploads.submit(file).await
    }

    pub async fn send(&self, text: &str) -> Result<SendOutcome, SendError> {
        self.conversation.send(text).await
    }

    pub async fn reset_conversation(&self) -> ThreadId {
        self.session.reset_conversation().await
    }

    pub async fn dismiss_notification(&self) {
        self.notifications.clear().await;
    }

    pub async fn active_document(&self) -> Option<DocumentDescriptor> {
        self.session.active_document().await
    }

    pub async fn thread_id(&self) -> ThreadId {
        self.session.thread_id().await
    }

    pub async fn history(&self) -> Vec<ChatEntry> {
        self.session.history().await
    }

    pub async fn catalog(&self) -> Vec<DocumentDescriptor> {
        self.session.catalog().await
    }

    pub async fn preview(&self) -> Preview {
        preview::resolve(self.session.active_document().await.as_ref())
    }

    pub async fn notification(&self) -> Notification {
        self.notifications.current().await
    }

    pub async fn upload_phase(&self) -> UploadPhase {
        self.uploads.phase().await
    }

    pub fn outstanding_sends(&self) -> usize {
        self.conversation.outstanding()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
