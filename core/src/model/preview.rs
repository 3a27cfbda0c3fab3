use crate::model::media::FileHandle;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Issues revocable preview URLs for locally selected files.
///
/// Nothing reclaims an entry except an explicit revoke, so every URL is owned
/// by a [`PreviewUrl`] that revokes itself when dropped.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashMap<String, PathBuf>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, handle: &FileHandle) -> PreviewUrl {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_id += 1;
        let url = format!("preview://{}/{}", state.next_id, handle.name);
        state.live.insert(url.clone(), handle.path.clone());
        PreviewUrl {
            url,
            registry: self.clone(),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.live.get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.live.len()
    }

    fn revoke(&self, url: &str) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.live.remove(url);
    }
}

#[derive(Debug)]
pub struct PreviewUrl {
    url: String,
    registry: PreviewRegistry,
}

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}
