use client_core::{ControllerView, Notification, Preview};
use shared::domain::{ChatEntry, ChatRole, DocumentDescriptor, ThreadId};

const TEXT_PREVIEW_LINES: usize = 5;

/// Renders controller output as plain lines on stdout. User messages are not
/// echoed since the terminal already shows what was typed.
pub struct TerminalView;

impl ControllerView for TerminalView {
    fn show_notification(&self, notification: &Notification) {
        if let Some(line) = format_notification(notification) {
            println!("{line}");
        }
    }

    fn show_preview(&self, document: Option<&DocumentDescriptor>, preview: &Preview) {
        println!("{}", format_preview(document, preview));
    }

    fn show_history(&self, thread_id: &ThreadId, history: &[ChatEntry]) {
        match history.last() {
            None => println!("--- thread {thread_id} ---"),
            Some(entry) => {
                if let Some(line) = format_entry(entry) {
                    println!("{line}");
                }
            }
        }
    }

    fn set_upload_enabled(&self, enabled: bool) {
        if !enabled {
            println!("(uploading...)");
        }
    }

    fn set_awaiting_response(&self, awaiting: bool) {
        if awaiting {
            println!("(waiting for an answer...)");
        }
    }
}

pub fn format_notification(notification: &Notification) -> Option<String> {
    if !notification.is_visible() {
        return None;
    }
    let tag = if notification.is_error { "error" } else { "info" };
    Some(format!("[{tag}] {}", notification.message))
}

pub fn format_entry(entry: &ChatEntry) -> Option<String> {
    match entry.role {
        ChatRole::User => None,
        ChatRole::Assistant => Some(format!("assistant: {}", entry.content)),
        ChatRole::System => Some(format!("system: {}", entry.content)),
    }
}

pub fn format_preview(document: Option<&DocumentDescriptor>, preview: &Preview) -> String {
    match (document, preview) {
        (Some(doc), Preview::Paged { locator }) => {
            format!("preview: {} (paged) {locator}", doc.filename)
        }
        (Some(doc), Preview::Text { text }) => {
            let excerpt: Vec<&str> = text.lines().take(TEXT_PREVIEW_LINES).collect();
            format!("preview: {}\n{}", doc.filename, excerpt.join("\n"))
        }
        _ => "preview: no document".to_string(),
    }
}
