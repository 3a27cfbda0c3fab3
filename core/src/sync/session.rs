use crate::model::{MediaUpload, OccupancySnapshot};
use crate::prelude::{AnalysisBackend, ClientConfig, StatusSource, SubmitError, SubmitResult};
use crate::sync::reconciler::OccupancyReconciler;
use crate::sync::store::{DisplayState, SnapshotStore, UpdateOrigin};
use crate::sync::submitter::AnalysisSubmitter;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::wire::AnalyzeOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Submitting,
    Streaming,
}

/// State handed back by a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialOutcome {
    pub acknowledgement: Option<String>,
    pub state: DisplayState,
    pub stream_url: String,
}

/// One monitoring session: submit once, then keep the display in sync.
///
/// Cloning yields another handle to the same session. Polling stops when
/// [`Session::close`] is called or the last handle is dropped. A closed session
/// stays closed.
pub struct Session<B: AnalysisBackend + StatusSource> {
    inner: Arc<SessionInner<B>>,
}

struct SessionInner<B: AnalysisBackend + StatusSource> {
    config: ClientConfig,
    backend: Arc<B>,
    submitter: AnalysisSubmitter<B>,
    reconciler: Mutex<OccupancyReconciler<B>>,
    // Written and read under the reconciler lock.
    closed: AtomicBool,
    store: SnapshotStore,
    stream_url: RwLock<Option<String>>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<B: AnalysisBackend + StatusSource> Clone for Session<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: AnalysisBackend + StatusSource> Session<B> {
    pub fn new(config: ClientConfig, backend: B) -> Self {
        Self::with_backend(config, Arc::new(backend))
    }

    pub fn with_backend(config: ClientConfig, backend: Arc<B>) -> Self {
        let store = SnapshotStore::new();
        let metrics = Arc::new(MetricsRecorder::new());
        let submitter = AnalysisSubmitter::new(backend.clone(), config.submit_mode, metrics.clone());
        let reconciler = OccupancyReconciler::new(
            backend.clone(),
            store.clone(),
            metrics.clone(),
            config.request_timeout(),
        );
        Self {
            inner: Arc::new(SessionInner {
                config,
                backend,
                submitter,
                reconciler: Mutex::new(reconciler),
                closed: AtomicBool::new(false),
                store,
                stream_url: RwLock::new(None),
                metrics,
                logger: LogManager::new("session"),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Submits `media` for analysis and arms the session on success.
    ///
    /// On success any previous loop is stopped, the initial state is written,
    /// the stream is armed and polling starts, all before the call returns and
    /// before the first tick can fire. On failure nothing changes: a loop left
    /// running by an earlier submit keeps running.
    ///
    /// Fails with [`SubmitError::Closed`] once the session is closed, including
    /// when [`Session::close`] runs while this request is still pending.
    pub async fn submit(&self, media: &MediaUpload) -> SubmitResult<InitialOutcome> {
        if self.is_closed() {
            return Err(SubmitError::Closed);
        }
        self.inner
            .submitter
            .submit(media, |outcome| self.arm(outcome))
            .await?
    }

    fn arm(&self, outcome: AnalyzeOutcome) -> SubmitResult<InitialOutcome> {
        let mut reconciler = self.reconciler();
        if self.inner.closed.load(Ordering::Acquire) {
            self.inner
                .logger
                .warn("analysis finished after the session closed, not arming");
            return Err(SubmitError::Closed);
        }
        reconciler.stop();

        let (snapshot, acknowledgement) = match outcome {
            AnalyzeOutcome::Acknowledged { message } => (OccupancySnapshot::empty(), message),
            AnalyzeOutcome::Completed(snapshot) => (snapshot, None),
        };
        self.inner.store.replace(snapshot, UpdateOrigin::Submit);

        let stream_url = self.inner.backend.stream_url();
        *self
            .inner
            .stream_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(stream_url.clone());

        reconciler.start(self.inner.config.poll_interval());
        self.inner
            .logger
            .record(&format!("session armed, stream at {stream_url}"));

        Ok(InitialOutcome {
            acknowledgement,
            state: self.inner.store.current(),
            stream_url,
        })
    }

    /// Stops polling and disarms the stream. The last state stays readable.
    /// A submit still pending is not armed when it completes.
    pub fn close(&self) {
        let mut reconciler = self.reconciler();
        self.inner.closed.store(true, Ordering::Release);
        reconciler.stop();
        drop(reconciler);
        let disarmed = self
            .inner
            .stream_url
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if disarmed.is_some() {
            self.inner.logger.record("session closed");
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.inner.submitter.is_in_flight() {
            SessionPhase::Submitting
        } else if self.reconciler().is_running() {
            SessionPhase::Streaming
        } else {
            SessionPhase::Idle
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.submitter.is_in_flight()
    }

    pub fn display(&self) -> DisplayState {
        self.inner.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.store.subscribe()
    }

    /// Set once a submit has succeeded, cleared by [`Session::close`].
    pub fn stream_url(&self) -> Option<String> {
        self.inner
            .stream_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    fn reconciler(&self) -> MutexGuard<'_, OccupancyReconciler<B>> {
        self.inner
            .reconciler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
