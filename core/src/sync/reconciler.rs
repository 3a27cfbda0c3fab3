use crate::prelude::{PollError, StatusSource};
use crate::sync::store::{SnapshotStore, UpdateOrigin};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::wire::StatusPayload;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Recurring fetch-and-reconcile loop feeding a [`SnapshotStore`].
///
/// Fetches run one at a time inside the loop: a tick that comes due while a
/// fetch is outstanding is skipped rather than queued. Each fetch is bounded by
/// `request_timeout`.
pub struct OccupancyReconciler<S: StatusSource> {
    source: Arc<S>,
    store: SnapshotStore,
    metrics: Arc<MetricsRecorder>,
    request_timeout: Duration,
    running: Option<RunningLoop>,
    logger: LogManager,
}

struct RunningLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl<S: StatusSource> OccupancyReconciler<S> {
    pub fn new(
        source: Arc<S>,
        store: SnapshotStore,
        metrics: Arc<MetricsRecorder>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            source,
            store,
            metrics,
            request_timeout,
            running: None,
            logger: LogManager::new("reconciler"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Starts polling every `interval`, replacing any loop already running.
    /// The first tick fires one interval after the call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, interval: Duration) {
        self.stop();
        // tokio intervals panic on a zero period.
        let interval = interval.max(MIN_INTERVAL);

        let token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            self.source.clone(),
            self.store.clone(),
            self.metrics.clone(),
            token.clone(),
            interval,
            self.request_timeout,
            self.logger,
        ));
        self.running = Some(RunningLoop { token, handle });
        self.logger
            .record(&format!("polling started every {} ms", interval.as_millis()));
    }

    /// Cancels the loop. No result is applied after this returns, even from a
    /// fetch that was already in flight. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            self.store.cancel_fenced(&running.token);
            running.handle.abort();
            self.logger.record("polling stopped");
        }
    }
}

impl<S: StatusSource> Drop for OccupancyReconciler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<S: StatusSource>(
    source: Arc<S>,
    store: SnapshotStore,
    metrics: Arc<MetricsRecorder>,
    token: CancellationToken,
    interval: Duration,
    request_timeout: Duration,
    logger: LogManager,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        metrics.record_tick();

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => {
                metrics.record_discarded();
                break;
            }
            fetched = time::timeout(request_timeout, source.fetch_status()) => fetched,
        };

        let candidate = match fetched {
            Ok(result) => result.and_then(StatusPayload::into_snapshot),
            Err(_) => Err(PollError::Timeout(request_timeout)),
        };

        match candidate {
            Ok(snapshot) => {
                let summary = format!(
                    "{} vehicles, {}/{} slots empty",
                    snapshot.vehicle_count(),
                    snapshot.empty_slot_ids().len(),
                    snapshot.total_slots()
                );
                match store.apply_unless_cancelled(&token, snapshot, UpdateOrigin::Poll) {
                    Some(revision) => {
                        metrics.record_applied();
                        logger.detail(&format!("revision {revision}: {summary}"));
                    }
                    None => {
                        metrics.record_discarded();
                        break;
                    }
                }
            }
            Err(err) => {
                metrics.record_failed();
                logger.warn(&format!("poll failed, keeping previous state: {err}"));
            }
        }
    }
}
