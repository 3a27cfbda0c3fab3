use crate::model::MediaUpload;
use crate::prelude::{
    AnalysisBackend, ClientConfig, PollError, PollResult, StatusSource, SubmitError, SubmitMode,
    SubmitResult,
};
use crate::wire::{AnalyzeOutcome, StatusPayload};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::future::Future;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const ANALYZE_PATH: &str = "analyze";
const STATUS_PATH: &str = "parking_spaces";
const STREAM_PATH: &str = "stream";

/// reqwest client for the analysis backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> reqwest::Result<Self> {
        // Uploads may take as long as the analysis itself, so only the
        // connection phase is bounded here. Poll deadlines live in the loop.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl AnalysisBackend for HttpBackend {
    fn analyze(
        &self,
        media: &MediaUpload,
        mode: SubmitMode,
    ) -> impl Future<Output = SubmitResult<AnalyzeOutcome>> + Send {
        let url = self.config.endpoint(ANALYZE_PATH);
        let client = self.client.clone();
        let media = media.clone();

        async move {
            let media_error = |reason: String| SubmitError::Media {
                path: media.path.display().to_string(),
                reason,
            };
            // Recordings can run to hundreds of MB; the body is streamed from disk.
            let file = File::open(&media.path)
                .await
                .map_err(|e| media_error(e.to_string()))?;
            let length = file
                .metadata()
                .await
                .map_err(|e| media_error(e.to_string()))?
                .len();
            let body = Body::wrap_stream(ReaderStream::new(file));
            let part = Part::stream_with_length(body, length)
                .file_name(media.name.clone())
                .mime_str(media.content_type())
                .map_err(|e| media_error(e.to_string()))?;

            let response = client
                .post(&url)
                .multipart(Form::new().part("file", part))
                .send()
                .await
                .map_err(|e| SubmitError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SubmitError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| SubmitError::Network(e.to_string()))?;
            AnalyzeOutcome::parse(&body, mode)
        }
    }

    fn stream_url(&self) -> String {
        self.config.endpoint(STREAM_PATH)
    }
}

impl StatusSource for HttpBackend {
    fn fetch_status(&self) -> impl Future<Output = PollResult<StatusPayload>> + Send {
        let request = self.client.get(self.config.endpoint(STATUS_PATH));

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| PollError::Network(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(PollError::Status(status.as_u16()));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| PollError::Network(e.to_string()))?;
            StatusPayload::parse(&body)
        }
    }
}
