use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of the random tokens used for global and restarted threads.
pub trait ThreadIdGenerator: Send + Sync {
    fn next_token(&self) -> String;
}

pub struct RandomThreadIds;

impl ThreadIdGenerator for RandomThreadIds {
    fn next_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic tokens `<prefix>-1`, `<prefix>-2`, ...
pub struct SequentialThreadIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialThreadIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl ThreadIdGenerator for SequentialThreadIds {
    fn next_token(&self) -> String {
        let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{next}", self.prefix)
    }
}
