use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use shared::{
    domain::{ChatEntry, ThreadId},
    protocol::ChatRequest,
};
use tracing::{debug, warn};

use crate::{
    error::SendError,
    notifications::{NotificationCenter, ShowOptions},
    session::SharedSession,
    transport::DocumentService,
    view::ControllerView,
};

pub const NO_ANSWER_PLACEHOLDER: &str = "No answer received.";
pub const DOCUMENT_REQUIRED_NOTICE: &str = "Please select a document first.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    Answered { thread_id: ThreadId, answer: String },
    /// The answer arrived after its thread stopped being the active one and
    /// was dropped.
    Discarded { thread_id: ThreadId },
}

/// Sends user messages tagged with the thread captured at send time.
///
/// Sends are not serialized. A late answer whose thread is no longer active
/// is discarded rather than shown in the wrong conversation.
pub struct ConversationChannel {
    service: Arc<dyn DocumentService>,
    session: Arc<SharedSession>,
    notifications: Arc<NotificationCenter>,
    view: Arc<dyn ControllerView>,
    require_document: bool,
    outstanding: AtomicUsize,
}

impl ConversationChannel {
    pub fn new(
        service: Arc<dyn DocumentService>,
        session: Arc<SharedSession>,
        notifications: Arc<NotificationCenter>,
        view: Arc<dyn ControllerView>,
        require_document: bool,
    ) -> Self {
        Self {
            service,
            session,
            notifications,
            view,
            require_document,
            outstanding: AtomicUsize::new(0),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub async fn send(&self, text: &str) -> Result<SendOutcome, SendError> {
        let message = text.trim();
        if message.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let captured = self.session.snapshot().await;
        if self.require_document && captured.document_id.is_none() {
            warn!("chat: rejected, no active document");
            self.view.clear_message_input();
            self.notifications
                .show(DOCUMENT_REQUIRED_NOTICE, ShowOptions::persistent_error())
                .await;
            return Err(SendError::NoActiveDocument);
        }

        self.session
            .append_to_thread(&captured, ChatEntry::user(message))
            .await;
        self.view.clear_message_input();

        let wait = self.begin_wait();
        let result = self
            .service
            .send_chat(ChatRequest {
                thread_id: captured.thread_id.clone(),
                document_id: captured.document_id.clone(),
                message: message.to_string(),
            })
            .await;
        drop(wait);

        let thread_id = captured.thread_id.clone();
        match result {
            Ok(answer) => {
                let answer = answer.unwrap_or_else(|| NO_ANSWER_PLACEHOLDER.to_string());
                if self
                    .session
                    .append_to_thread(&captured, ChatEntry::assistant(answer.clone()))
                    .await
                {
                    Ok(SendOutcome::Answered { thread_id, answer })
                } else {
                    debug!(%thread_id, "chat: discarding answer for inactive thread");
                    Ok(SendOutcome::Discarded { thread_id })
                }
            }
            Err(err) => {
                warn!(%thread_id, "chat: send failed: {err}");
                let note = ChatEntry::system(format!("Error: {}", err.user_message()));
                if self.session.append_to_thread(&captured, note).await {
                    self.notifications
                        .show(
                            format!("Message failed: {}", err.user_message()),
                            ShowOptions::persistent_error(),
                        )
                        .await;
                } else {
                    debug!(%thread_id, "chat: suppressing failure for inactive thread");
                }
                Err(SendError::Transport(err))
            }
        }
    }

    fn begin_wait(&self) -> WaitGuard<'_> {
        if self.outstanding.fetch_add(1, Ordering::SeqCst) == 0 {
            self.view.set_awaiting_response(true);
        }
        WaitGuard { channel: self }
    }
}

/// Counts one outstanding send; released on drop so a cancelled send still
/// clears the awaiting indicator.
struct WaitGuard<'a> {
    channel: &'a ConversationChannel,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if self.channel.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.channel.view.set_awaiting_response(false);
        }
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;
