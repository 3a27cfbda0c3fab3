use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub polls_applied: u64,
    pub polls_failed: u64,
    pub polls_discarded: u64,
    pub submits: u64,
    pub submit_failures: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_tick(&self) {
        self.update(|m| m.ticks += 1);
    }

    pub fn record_applied(&self) {
        self.update(|m| m.polls_applied += 1);
    }

    pub fn record_failed(&self) {
        self.update(|m| m.polls_failed += 1);
    }

    /// A fetch that completed, or was still pending, after its loop was stopped.
    pub fn record_discarded(&self) {
        self.update(|m| m.polls_discarded += 1);
    }

    pub fn record_submit(&self, succeeded: bool) {
        self.update(|m| {
            m.submits += 1;
            if !succeeded {
                m.submit_failures += 1;
            }
        });
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = MetricsRecorder::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_applied();
        metrics.record_failed();
        metrics.record_submit(true);
        metrics.record_submit(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.polls_applied, 1);
        assert_eq!(snapshot.polls_failed, 1);
        assert_eq!(snapshot.polls_discarded, 0);
        assert_eq!(snapshot.submits, 2);
        assert_eq!(snapshot.submit_failures, 1);
    }
}
