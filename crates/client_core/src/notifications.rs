use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::view::ControllerView;

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(2500);

/// The single status line. An empty message means nothing is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    /// `None` keeps the notification until it is replaced or cleared.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_visible(&self) -> bool {
        !self.message.is_empty()
    }

    pub fn is_persistent(&self) -> bool {
        self.is_visible() && self.expires_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowOptions {
    pub is_error: bool,
    pub persist: bool,
    /// Overrides the center's default lifetime for transient notices.
    pub ttl: Option<Duration>,
}

impl ShowOptions {
    pub fn transient() -> Self {
        Self::default()
    }

    pub fn persistent_error() -> Self {
        Self {
            is_error: true,
            persist: true,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

struct NotificationSlot {
    current: Notification,
    generation: u64,
    expiry_task: Option<JoinHandle<()>>,
}

pub struct NotificationCenter {
    slot: Mutex<NotificationSlot>,
    default_ttl: Duration,
    view: Arc<dyn ControllerView>,
}

impl NotificationCenter {
    pub fn new(view: Arc<dyn ControllerView>, default_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(NotificationSlot {
                current: Notification::default(),
                generation: 0,
                expiry_task: None,
            }),
            default_ttl,
            view,
        })
    }

    /// Replaces whatever is showing. A pending expiry of the previous notice
    /// is cancelled, so only the newest one can hide itself.
    pub async fn show(self: &Arc<Self>, message: impl Into<String>, options: ShowOptions) {
        let message = message.into();
        let ttl = (!options.persist && !message.is_empty())
            .then(|| options.ttl.unwrap_or(self.default_ttl));

        let mut slot = self.slot.lock().await;
        if let Some(task) = slot.expiry_task.take() {
            task.abort();
        }
        slot.generation += 1;
        slot.current = Notification {
            is_error: options.is_error && !message.is_empty(),
            expires_at: ttl.and_then(|ttl| {
                chrono::Duration::from_std(ttl)
                    .ok()
                    .map(|ttl| Utc::now() + ttl)
            }),
            message,
        };
        self.view.show_notification(&slot.current);

        if let Some(ttl) = ttl {
            let generation = slot.generation;
            let center = Arc::clone(self);
            slot.expiry_task = Some(tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                center.expire(generation).await;
            }));
        }
    }

    pub async fn clear(self: &Arc<Self>) {
        self.show("", ShowOptions::default()).await;
    }

    pub async fn current(&self) -> Notification {
        self.slot.lock().await.current.clone()
    }

    async fn expire(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            return;
        }
        slot.expiry_task = None;
        slot.current = Notification::default();
        self.view.show_notification(&slot.current);
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
