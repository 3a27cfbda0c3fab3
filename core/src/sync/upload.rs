use crate::model::{FileHandle, MediaKind, MediaUpload, PreviewRegistry, SelectedMedia};
use crate::prelude::{SubmitError, SubmitResult};
use crate::telemetry::LogManager;

/// Holds the operator's file selection and gates analysis on it.
pub struct UploadGate {
    registry: PreviewRegistry,
    selected: Option<SelectedMedia>,
    logger: LogManager,
}

impl UploadGate {
    pub fn new() -> Self {
        Self::with_registry(PreviewRegistry::new())
    }

    pub fn with_registry(registry: PreviewRegistry) -> Self {
        Self {
            registry,
            selected: None,
            logger: LogManager::new("upload"),
        }
    }

    /// Replaces the selection. `None` leaves everything as it was and returns `None`.
    ///
    /// The previous preview URL is revoked before the new one is minted.
    pub fn select_file(&mut self, handle: Option<FileHandle>) -> Option<&SelectedMedia> {
        let handle = handle?;
        drop(self.selected.take());

        let kind = MediaKind::classify(&handle.name, handle.mime.as_deref());
        let preview = self.registry.create(&handle);
        self.logger.record(&format!(
            "selected {} ({:?}) -> {}",
            handle.name,
            kind,
            preview.as_str()
        ));
        self.selected = Some(SelectedMedia::new(handle, preview, kind));
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&SelectedMedia> {
        self.selected.as_ref()
    }

    /// Validation run before every submit.
    pub fn request_upload(&self) -> SubmitResult<MediaUpload> {
        self.selected
            .as_ref()
            .map(SelectedMedia::to_upload)
            .ok_or(SubmitError::NoFileSelected)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }
}

impl Default for UploadGate {
    fn default() -> Self {
        Self::new()
    }
}
