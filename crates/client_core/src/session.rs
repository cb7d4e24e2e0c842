//! Active document, conversation thread and catalog.
//!
//! [`SessionStore`] is the synchronous state machine. [`SharedSession`] wraps it
//! behind a lock for the coordinators and announces transitions to the
//! notification center and the view.

use std::{collections::HashSet, sync::Arc};

use shared::domain::{ChatEntry, DocumentDescriptor, DocumentId, ThreadId};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    ids::ThreadIdGenerator,
    notifications::{NotificationCenter, ShowOptions},
    preview,
    view::ControllerView,
};

pub const NO_DOCUMENT_NOTICE: &str = "No document selected";

/// Outcome of a change of active document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    Opened {
        document: DocumentDescriptor,
        thread_id: ThreadId,
    },
    Cleared {
        thread_id: ThreadId,
    },
}

impl SessionTransition {
    pub fn notice(&self) -> String {
        match self {
            SessionTransition::Opened { document, .. } => {
                format!("Document opened: {}", document.filename)
            }
            SessionTransition::Cleared { .. } => NO_DOCUMENT_NOTICE.to_string(),
        }
    }
}

/// The thread/document binding captured when a message is sent.
///
/// `epoch` changes on every transition and reset, so a snapshot taken before
/// an A to B to A switch no longer matches even though the thread id does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub thread_id: ThreadId,
    pub document_id: Option<DocumentId>,
    pub epoch: u64,
}

pub struct SessionStore {
    catalog: Vec<DocumentDescriptor>,
    active: Option<DocumentDescriptor>,
    thread_id: ThreadId,
    history: Vec<ChatEntry>,
    epoch: u64,
    ids: Arc<dyn ThreadIdGenerator>,
}

impl SessionStore {
    pub fn new(ids: Arc<dyn ThreadIdGenerator>) -> Self {
        let thread_id = ThreadId::new(ids.next_token());
        Self {
            catalog: Vec::new(),
            active: None,
            thread_id,
            history: Vec::new(),
            epoch: 0,
            ids,
        }
    }

    pub fn catalog(&self) -> &[DocumentDescriptor] {
        &self.catalog
    }

    pub fn active_document(&self) -> Option<&DocumentDescriptor> {
        self.active.as_ref()
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            thread_id: self.thread_id.clone(),
            document_id: self.active.as_ref().map(|doc| doc.id.clone()),
            epoch: self.epoch,
        }
    }

    /// Whether `binding` still describes the live conversation.
    pub fn is_current(&self, binding: &SessionSnapshot) -> bool {
        self.epoch == binding.epoch && self.thread_id == binding.thread_id
    }

    pub fn find(&self, id: &DocumentId) -> Option<&DocumentDescriptor> {
        self.catalog.iter().find(|doc| &doc.id == id)
    }

    /// Re-selecting the active id is a no-op; anything else starts a new
    /// thread and drops the history.
    pub fn set_active_document(
        &mut self,
        document: Option<DocumentDescriptor>,
    ) -> Option<SessionTransition> {
        let current = self.active.as_ref().map(|doc| &doc.id);
        let next = document.as_ref().map(|doc| &doc.id);
        if current == next {
            return None;
        }

        self.history.clear();
        self.epoch += 1;
        match document {
            Some(document) => {
                self.thread_id = ThreadId::for_document(&document.id);
                self.active = Some(document.clone());
                Some(SessionTransition::Opened {
                    document,
                    thread_id: self.thread_id.clone(),
                })
            }
            None => {
                self.thread_id = ThreadId::new(self.ids.next_token());
                self.active = None;
                Some(SessionTransition::Cleared {
                    thread_id: self.thread_id.clone(),
                })
            }
        }
    }

    /// Swaps the whole catalog. The active document survives only if its id
    /// is still listed, in which case the refreshed descriptor replaces it.
    pub fn replace_catalog(
        &mut self,
        catalog: Vec<DocumentDescriptor>,
    ) -> Option<SessionTransition> {
        let mut seen = HashSet::new();
        self.catalog = catalog
            .into_iter()
            .filter(|doc| {
                let fresh = seen.insert(doc.id.clone());
                if !fresh {
                    warn!(id = %doc.id, "catalog: dropping duplicate document id");
                }
                fresh
            })
            .collect();

        let active_id = self.active.as_ref().map(|doc| doc.id.clone())?;
        match self.find(&active_id).cloned() {
            Some(refreshed) => {
                self.active = Some(refreshed);
                None
            }
            None => self.set_active_document(None),
        }
    }

    /// Puts `document` at the front of the catalog, replacing an entry with
    /// the same id.
    pub fn register_document(&mut self, document: DocumentDescriptor) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.id == document.id)
        {
            self.active = Some(document.clone());
        }
        self.catalog.retain(|doc| doc.id != document.id);
        self.catalog.insert(0, document);
    }

    /// New thread for the same binding. With a document active the thread
    /// stays attributable to it.
    pub fn reset_conversation(&mut self) -> ThreadId {
        let token = self.ids.next_token();
        self.thread_id = match &self.active {
            Some(doc) => ThreadId::restarted_for_document(&doc.id, &token),
            None => ThreadId::new(token),
        };
        self.history.clear();
        self.epoch += 1;
        self.thread_id.clone()
    }

    /// Appends to the history only while `binding` is still current. Returns
    /// whether the entry was kept.
    pub fn append_to_thread(&mut self, binding: &SessionSnapshot, entry: ChatEntry) -> bool {
        if !self.is_current(binding) {
            return false;
        }
        self.history.push(entry);
        true
    }
}

pub struct SharedSession {
    store: Mutex<SessionStore>,
    notifications: Arc<NotificationCenter>,
    view: Arc<dyn ControllerView>,
}

impl SharedSession {
    pub fn new(
        store: SessionStore,
        notifications: Arc<NotificationCenter>,
        view: Arc<dyn ControllerView>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            notifications,
            view,
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.store.lock().await.snapshot()
    }

    pub async fn active_document(&self) -> Option<DocumentDescriptor> {
        self.store.lock().await.active_document().cloned()
    }

    pub async fn thread_id(&self) -> ThreadId {
        self.store.lock().await.thread_id().clone()
    }

    pub async fn history(&self) -> Vec<ChatEntry> {
        self.store.lock().await.history().to_vec()
    }

    pub async fn catalog(&self) -> Vec<DocumentDescriptor> {
        self.store.lock().await.catalog().to_vec()
    }

    pub async fn find(&self, id: &DocumentId) -> Option<DocumentDescriptor> {
        self.store.lock().await.find(id).cloned()
    }

    /// Returns `true` when the call was a transition.
    pub async fn set_active_document(&self, document: Option<DocumentDescriptor>) -> bool {
        let mut store = self.store.lock().await;
        let transition = store.set_active_document(document);
        if transition.is_some() {
            self.render(&store);
        }
        self.announce(transition).await
    }

    pub async fn replace_catalog(&self, catalog: Vec<DocumentDescriptor>) -> bool {
        let mut store = self.store.lock().await;
        let before = store.active_document().cloned();
        let transition = store.replace_catalog(catalog);
        if transition.is_some() {
            self.render(&store);
        } else {
            if store.active_document() != before.as_ref() {
                self.render_preview(&store);
            }
            self.render_catalog(&store);
        }
        self.announce(transition).await
    }

    /// Adds a freshly uploaded document to the catalog and makes it active.
    pub async fn register_and_activate(&self, document: DocumentDescriptor) -> bool {
        let mut store = self.store.lock().await;
        store.register_document(document.clone());
        let transition = store.set_active_document(Some(document));
        self.render(&store);
        self.announce(transition).await
    }

    pub async fn reset_conversation(&self) -> ThreadId {
        let mut store = self.store.lock().await;
        let thread_id = store.reset_conversation();
        info!(%thread_id, "session: conversation reset");
        self.view.show_history(store.thread_id(), store.history());
        thread_id
    }

    pub async fn append_to_thread(&self, binding: &SessionSnapshot, entry: ChatEntry) -> bool {
        let mut store = self.store.lock().await;
        let kept = store.append_to_thread(binding, entry);
        if kept {
            self.view.show_history(store.thread_id(), store.history());
        }
        kept
    }

    fn render(&self, store: &SessionStore) {
        self.render_preview(store);
        self.view.show_history(store.thread_id(), store.history());
        self.render_catalog(store);
    }

    fn render_preview(&self, store: &SessionStore) {
        let active = store.active_document();
        self.view.show_preview(active, &preview::resolve(active));
    }

    fn render_catalog(&self, store: &SessionStore) {
        self.view.show_catalog(
            store.catalog(),
            store.active_document().map(|doc| &doc.id),
        );
    }

    /// Callers hold the store lock so notices land in transition order.
    async fn announce(&self, transition: Option<SessionTransition>) -> bool {
        let Some(transition) = transition else {
            return false;
        };
        match &transition {
            SessionTransition::Opened {
                document,
                thread_id,
            } => info!(id = %document.id, %thread_id, "session: document opened"),
            SessionTransition::Cleared { thread_id } => {
                info!(%thread_id, "session: no document selected")
            }
        }
        self.notifications
            .show(transition.notice(), ShowOptions::transient())
            .await;
        true
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
