use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::domain::DocumentDescriptor;
use tracing::{info, warn};

use crate::{
    error::UploadError,
    notifications::{NotificationCenter, ShowOptions},
    session::SharedSession,
    transport::{DocumentService, UploadFile},
    view::ControllerView,
};

pub const DEFAULT_SUCCESS_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Validating,
    InFlight,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, UploadPhase::Validating | UploadPhase::InFlight)
    }
}

/// Drives one upload at a time: validate, submit, then register the new
/// document in the session and make it active.
pub struct UploadCoordinator {
    service: Arc<dyn DocumentService>,
    session: Arc<SharedSession>,
    notifications: Arc<NotificationCenter>,
    view: Arc<dyn ControllerView>,
    phase: Mutex<UploadPhase>,
    success_ttl: Duration,
}

impl UploadCoordinator {
    pub fn new(
        service: Arc<dyn DocumentService>,
        session: Arc<SharedSession>,
        notifications: Arc<NotificationCenter>,
        view: Arc<dyn ControllerView>,
        success_ttl: Duration,
    ) -> Self {
        Self {
            service,
            session,
            notifications,
            view,
            phase: Mutex::new(UploadPhase::Idle),
            success_ttl,
        }
    }

    pub async fn phase(&self) -> UploadPhase {
        *self.lock_phase()
    }

    pub async fn submit(
        &self,
        file: Option<UploadFile>,
    ) -> Result<DocumentDescriptor, UploadError> {
        {
            let mut phase = self.lock_phase();
            if phase.is_busy() {
                warn!("upload: rejected, another upload is in flight");
                return Err(UploadError::AlreadyInFlight);
            }
            *phase = UploadPhase::Validating;
        }
        let mut cycle = UploadCycle {
            coordinator: self,
            uploads_disabled: false,
        };

        let file = match validate(file) {
            Ok(file) => file,
            Err(err) => {
                self.set_phase(UploadPhase::Failed);
                self.notifications
                    .show(user_input_notice(&err), ShowOptions::persistent_error())
                    .await;
                return Err(err);
            }
        };

        self.set_phase(UploadPhase::InFlight);
        cycle.disable_uploads();
        let filename = file.filename.clone();
        let result = self.service.upload_document(file).await;
        cycle.enable_uploads();

        match result {
            Ok(document) => {
                let document = document.normalized();
                info!(id = %document.id, filename = %document.filename, "upload: stored");
                self.session.register_and_activate(document.clone()).await;
                self.view.clear_file_selection();
                self.set_phase(UploadPhase::Succeeded);
                self.notifications
                    .show(
                        format!("Uploaded {}", document.filename),
                        ShowOptions::transient().with_ttl(self.success_ttl),
                    )
                    .await;
                Ok(document)
            }
            Err(err) => {
                warn!(%filename, "upload: failed: {err}");
                self.set_phase(UploadPhase::Failed);
                self.notifications
                    .show(
                        format!("Upload failed: {}", err.user_message()),
                        ShowOptions::persistent_error(),
                    )
                    .await;
                Err(UploadError::Transport(err))
            }
        }
    }

    fn set_phase(&self, next: UploadPhase) {
        *self.lock_phase() = next;
    }

    fn lock_phase(&self) -> MutexGuard<'_, UploadPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One pass through `submit`. If the submitting future is dropped midway the
/// coordinator goes back to idle and the upload control is re-enabled.
struct UploadCycle<'a> {
    coordinator: &'a UploadCoordinator,
    uploads_disabled: bool,
}

impl UploadCycle<'_> {
    fn disable_uploads(&mut self) {
        self.coordinator.view.set_upload_enabled(false);
        self.uploads_disabled = true;
    }

    fn enable_uploads(&mut self) {
        self.coordinator.view.set_upload_enabled(true);
        self.uploads_disabled = false;
    }
}

impl Drop for UploadCycle<'_> {
    fn drop(&mut self) {
        if self.uploads_disabled {
            self.coordinator.view.set_upload_enabled(true);
        }
        let mut phase = self.coordinator.lock_phase();
        if phase.is_busy() {
            warn!("upload: abandoned before completion");
            *phase = UploadPhase::Idle;
        }
    }
}

fn validate(file: Option<UploadFile>) -> Result<UploadFile, UploadError> {
    let file = file.ok_or(UploadError::NoFileSelected)?;
    if file.bytes.is_empty() {
        return Err(UploadError::EmptyFile(file.filename));
    }
    Ok(file)
}

fn user_input_notice(err: &UploadError) -> String {
    match err {
        UploadError::EmptyFile(filename) => format!("The file {filename} is empty."),
        _ => "Please choose a file to upload.".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
