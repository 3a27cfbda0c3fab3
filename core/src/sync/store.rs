use crate::classify::CongestionLevel;
use crate::model::OccupancySnapshot;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOrigin {
    Initial,
    Submit,
    Poll,
}

/// What the presentation layer renders. Always replaced as one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub snapshot: OccupancySnapshot,
    pub congestion: CongestionLevel,
    pub revision: u64,
    pub origin: UpdateOrigin,
}

impl DisplayState {
    fn initial() -> Self {
        let snapshot = OccupancySnapshot::empty();
        Self {
            congestion: snapshot.congestion(),
            snapshot,
            revision: 0,
            origin: UpdateOrigin::Initial,
        }
    }
}

/// Shared display state written by the submitter and the polling loop.
///
/// Loop cancellation and poll application both take the write lock, so once
/// [`SnapshotStore::cancel_fenced`] returns no result from that loop can land.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    state: Arc<RwLock<DisplayState>>,
    revisions: Arc<watch::Sender<u64>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (revisions, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(DisplayState::initial())),
            revisions: Arc::new(revisions),
        }
    }

    pub fn current(&self) -> DisplayState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receiver that observes the revision number of every applied update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revisions.subscribe()
    }

    pub fn replace(&self, snapshot: OccupancySnapshot, origin: UpdateOrigin) -> u64 {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.install(&mut state, snapshot, origin)
    }

    /// Applies a poll result unless `token` was cancelled. Returns the new revision.
    pub fn apply_unless_cancelled(
        &self,
        token: &CancellationToken,
        snapshot: OccupancySnapshot,
        origin: UpdateOrigin,
    ) -> Option<u64> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            return None;
        }
        Some(self.install(&mut state, snapshot, origin))
    }

    pub fn cancel_fenced(&self, token: &CancellationToken) {
        let _state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
    }

    fn install(
        &self,
        state: &mut DisplayState,
        snapshot: OccupancySnapshot,
        origin: UpdateOrigin,
    ) -> u64 {
        let revision = state.revision + 1;
        *state = DisplayState {
            congestion: snapshot.congestion(),
            snapshot,
            revision,
            origin,
        };
        self.revisions.send_replace(revision);
        revision
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
