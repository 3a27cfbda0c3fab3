use crate::workflow::config::MonitorConfig;
use crate::workflow::report::render_line;
use anyhow::Context;
use lotcore::model::FileHandle;
use lotcore::prelude::{AnalysisBackend, StatusSource};
use lotcore::telemetry::MetricsSnapshot;
use lotcore::{DisplayState, Session, UploadGate};
use log::info;
use serde::Serialize;
use std::future::{self, Future};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub media: String,
    pub updates: u64,
    pub last: DisplayState,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: MonitorConfig,
}

impl Runner {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Submits the configured media, then prints every display update until
    /// `shutdown` resolves or the run limit passes. The session is closed on return.
    pub async fn execute<B, F>(&self, session: &Session<B>, shutdown: F) -> anyhow::Result<RunSummary>
    where
        B: AnalysisBackend + StatusSource,
        F: Future<Output = ()>,
    {
        let media = self
            .config
            .media
            .clone()
            .context("no media file configured (use --file or `media:` in the config)")?;
        let mut handle = FileHandle::from_path(media);
        if let Some(mime) = &self.config.mime {
            handle = handle.with_mime(mime.clone());
        }

        let mut gate = UploadGate::new();
        gate.select_file(Some(handle));
        let upload = gate.request_upload()?;

        let mut updates = session.subscribe();
        let outcome = session
            .submit(&upload)
            .await
            .with_context(|| format!("submitting {} for analysis", upload.name))?;
        updates.borrow_and_update();

        if let Some(message) = &outcome.acknowledgement {
            info!("backend: {message}");
        }
        println!("Live stream: {}", outcome.stream_url);
        println!("{}", render_line(&outcome.state));

        let run_limit = self.config.run_secs.map(Duration::from_secs);
        let limit = async move {
            match run_limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(limit);

        let mut count = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = &mut limit => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    updates.borrow_and_update();
                    count += 1;
                    println!("{}", render_line(&session.display()));
                }
            }
        }
        session.close();

        Ok(RunSummary {
            media: upload.name,
            updates: count,
            last: session.display(),
            metrics: session.metrics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotcore::model::MediaUpload;
    use lotcore::prelude::{PollResult, SubmitError, SubmitResult};
    use lotcore::wire::{AnalyzeOutcome, StatusPayload};
    use lotcore::{ClientConfig, CongestionLevel, SessionPhase, SubmitMode};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Each poll reports one more parked car on a four-slot lot.
    struct FillingLot {
        parked: AtomicI64,
    }

    impl AnalysisBackend for FillingLot {
        fn analyze(
            &self,
            media: &MediaUpload,
            _mode: SubmitMode,
        ) -> impl Future<Output = SubmitResult<AnalyzeOutcome>> + Send {
            let known = media.name == "lot.mp4";
            async move {
                if known {
                    Ok(AnalyzeOutcome::Acknowledged { message: None })
                } else {
                    Err(SubmitError::Status {
                        status: 404,
                        body: "no such video".into(),
                    })
                }
            }
        }

        fn stream_url(&self) -> String {
            "http://lot/stream".into()
        }
    }

    impl StatusSource for FillingLot {
        fn fetch_status(&self) -> impl Future<Output = PollResult<StatusPayload>> + Send {
            let parked = (self.parked.fetch_add(1, Ordering::SeqCst) + 1).min(4);
            let spaces: Vec<serde_json::Value> = (1..=4i64)
                .map(|id| {
                    let occupied = i64::from(id <= parked);
                    serde_json::json!({"id": id, "occupied": occupied})
                })
                .collect();
            let body = serde_json::json!({
                "vehicles": [{"type": "car", "count": parked}],
                "spaces": spaces
            });
            async move { StatusPayload::parse(body.to_string().as_bytes()) }
        }
    }

    fn config(media: &str, run_secs: Option<u64>) -> MonitorConfig {
        MonitorConfig {
            client: ClientConfig::default(),
            media: Some(media.into()),
            mime: Some("video/mp4".into()),
            run_secs,
            report: None,
        }
    }

    fn session(poll_interval_ms: u64) -> Session<FillingLot> {
        Session::new(
            ClientConfig {
                poll_interval_ms,
                ..Default::default()
            },
            FillingLot {
                parked: AtomicI64::new(0),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn run_limit_ends_session() {
        // Ticks at 700, 1400, 2100 and 2800 ms fall inside the 3 s limit.
        let session = session(700);
        let runner = Runner::new(config("lot.mp4", Some(3)));

        let summary = runner
            .execute(&session, future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(summary.updates, 4);
        assert_eq!(summary.last.snapshot.vehicle_count(), 4);
        assert_eq!(summary.last.congestion, CongestionLevel::Critical);
        assert_eq!(summary.metrics.polls_applied, 4);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_signal_ends_session() {
        let session = session(1000);
        let runner = Runner::new(config("lot.mp4", None));

        let summary = runner
            .execute(&session, tokio::time::sleep(Duration::from_millis(4500)))
            .await
            .unwrap();

        assert_eq!(summary.updates, 4);
        assert_eq!(summary.last.snapshot.vehicle_count(), 4);
        assert_eq!(summary.last.snapshot.empty_slot_ids().len(), 0);
        assert_eq!(summary.last.congestion, CongestionLevel::Critical);
        assert!(session.stream_url().is_none());
    }

    #[tokio::test]
    async fn submit_failure_is_reported_with_context() {
        let session = session(1000);
        let runner = Runner::new(config("missing.mp4", Some(1)));

        let err = runner
            .execute(&session, future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("submitting missing.mp4"));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn missing_media_is_a_config_error() {
        let session = session(1000);
        let mut cfg = config("lot.mp4", Some(1));
        cfg.media = None;

        let err = Runner::new(cfg)
            .execute(&session, future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no media file configured"));
    }
}
