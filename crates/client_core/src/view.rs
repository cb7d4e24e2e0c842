//! Capability the controller renders through. Front-ends implement the parts
//! they care about; every method defaults to doing nothing.

use shared::domain::{ChatEntry, DocumentDescriptor, DocumentId, ThreadId};

use crate::{notifications::Notification, preview::Preview};

pub trait ControllerView: Send + Sync {
    fn show_notification(&self, _notification: &Notification) {}

    fn show_preview(&self, _document: Option<&DocumentDescriptor>, _preview: &Preview) {}

    fn show_catalog(&self, _catalog: &[DocumentDescriptor], _active: Option<&DocumentId>) {}

    fn show_history(&self, _thread_id: &ThreadId, _history: &[ChatEntry]) {}

    fn set_upload_enabled(&self, _enabled: bool) {}

    fn clear_file_selection(&self) {}

    fn clear_message_input(&self) {}

    fn set_awaiting_response(&self, _awaiting: bool) {}
}

pub struct HeadlessView;

impl ControllerView for HeadlessView {}
