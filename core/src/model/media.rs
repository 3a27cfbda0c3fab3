use crate::model::preview::PreviewUrl;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "wmv", "webm"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Declared MIME type wins; the file extension is only a fallback.
    pub fn classify(name: &str, mime: Option<&str>) -> Self {
        if let Some(mime) = mime.map(str::trim).filter(|m| !m.is_empty()) {
            let mime = mime.to_ascii_lowercase();
            if mime.starts_with("video/") {
                return MediaKind::Video;
            }
            if mime.starts_with("image/") {
                return MediaKind::Image;
            }
        }

        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

/// Local file chosen by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub mime: Option<String>,
}

impl FileHandle {
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Currently selected media together with its live preview URL.
#[derive(Debug)]
pub struct SelectedMedia {
    handle: FileHandle,
    preview: PreviewUrl,
    kind: MediaKind,
}

impl SelectedMedia {
    pub(crate) fn new(handle: FileHandle, preview: PreviewUrl, kind: MediaKind) -> Self {
        Self {
            handle,
            preview,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }

    pub fn preview_url(&self) -> &str {
        self.preview.as_str()
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn to_upload(&self) -> MediaUpload {
        MediaUpload {
            path: self.handle.path.clone(),
            name: self.handle.name.clone(),
            mime: self.handle.mime.clone(),
            kind: self.kind,
        }
    }
}

/// Everything the submitter needs to send a file, detached from the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub path: PathBuf,
    pub name: String,
    pub mime: Option<String>,
    pub kind: MediaKind,
}

impl MediaUpload {
    pub fn content_type(&self) -> &str {
        self.mime.as_deref().unwrap_or("application/octet-stream")
    }
}
