use crate::model::MediaUpload;
use crate::wire::{AnalyzeOutcome, StatusPayload};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How the backend answers `POST /analyze`.
///
/// The response body is parsed strictly according to this flag; the shape of
/// the body is never used to guess the mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Receipt only. Occupancy arrives exclusively through polling.
    #[default]
    Acknowledge,
    /// The full occupancy result comes back with the submit response.
    ImmediateResult,
}

/// Connection settings shared by the submitter and the polling loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub submit_mode: SubmitMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
            submit_mode: SubmitMode::default(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    /// Joins `path` onto the base URL without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// User-visible failure of an analysis submission.
#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("no file selected: upload a file before starting analysis")]
    NoFileSelected,
    #[error("an analysis request is already in flight")]
    InFlight,
    #[error("session closed before the analysis could be armed")]
    Closed,
    #[error("cannot read media {path}: {reason}")]
    Media { path: String, reason: String },
    #[error("network failure: {0}")]
    Network(String),
    #[error("backend rejected the upload ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("backend refused the analysis: {0}")]
    Rejected(String),
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

/// Transient failure of a single poll tick. Logged, never surfaced per tick.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("status endpoint returned {0}")]
    Status(u16),
    #[error("malformed status payload: {0}")]
    Malformed(String),
    #[error("backend reported: {0}")]
    Backend(String),
    #[error("status request exceeded {0:?}")]
    Timeout(Duration),
}

pub type SubmitResult<T> = Result<T, SubmitError>;
pub type PollResult<T> = Result<T, PollError>;

/// Backend surface that accepts media for analysis.
pub trait AnalysisBackend: Send + Sync + 'static {
    fn analyze(
        &self,
        media: &MediaUpload,
        mode: SubmitMode,
    ) -> impl Future<Output = SubmitResult<AnalyzeOutcome>> + Send;

    /// Location of the annotated live stream, displayed once a session is armed.
    fn stream_url(&self) -> String;
}

/// Backend surface polled for the current occupancy status.
pub trait StatusSource: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = PollResult<StatusPayload>> + Send;
}
