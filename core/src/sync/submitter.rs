use crate::model::MediaUpload;
use crate::prelude::{AnalysisBackend, SubmitError, SubmitMode, SubmitResult};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::wire::AnalyzeOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot `POST /analyze` with a single-flight guard.
pub struct AnalysisSubmitter<B: AnalysisBackend> {
    backend: Arc<B>,
    mode: SubmitMode,
    in_flight: AtomicBool,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> SubmitResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(flag))
            .map_err(|_| SubmitError::InFlight)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<B: AnalysisBackend> AnalysisSubmitter<B> {
    pub fn new(backend: Arc<B>, mode: SubmitMode, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            backend,
            mode,
            in_flight: AtomicBool::new(false),
            metrics,
            logger: LogManager::new("submit"),
        }
    }

    pub fn mode(&self) -> SubmitMode {
        self.mode
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sends `media` and, on success, runs `on_success` before the request is
    /// considered finished. A second call while one is pending fails with
    /// [`SubmitError::InFlight`] and never reaches the backend.
    pub async fn submit<T>(
        &self,
        media: &MediaUpload,
        on_success: impl FnOnce(AnalyzeOutcome) -> T,
    ) -> SubmitResult<T> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        self.logger
            .record(&format!("submitting {} ({:?} mode)", media.name, self.mode));

        match self.backend.analyze(media, self.mode).await {
            Ok(outcome) => {
                self.metrics.record_submit(true);
                Ok(on_success(outcome))
            }
            Err(err) => {
                self.metrics.record_submit(false);
                self.logger.warn(&format!("analysis of {} failed: {err}", media.name));
                Err(err)
            }
        }
    }
}
