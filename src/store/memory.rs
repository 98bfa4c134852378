use crate::store::{StoreError, StoreErrorKind, VersionStore};

use std::sync::Arc;
use tokio::sync::Mutex;


#[derive(Debug, Default)]
struct MemoryState {
    version: i64,
    history: Vec<i64>,
    unavailable: bool,
}

/// Version cursor kept in process memory.
///
/// Clones share the same cursor, so a caller can hand one clone to an
/// executor and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: i64) -> Self {
        let state = MemoryState { version, ..MemoryState::default() };
        MemoryStore { state: Arc::new(Mutex::new(state)) }
    }

    /// Every value written with `set_current_version`, oldest first.
    pub async fn history(&self) -> Vec<i64> {
        self.state.lock().await.history.clone()
    }

    /// Make subsequent reads and writes fail with `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryStore {
    async fn current_version(&mut self) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        if state.unavailable {
            return Err(StoreError::new(StoreErrorKind::Unavailable("memory store switched off".into())));
        }
        Ok(state.version)
    }

    async fn set_current_version(&mut self, version: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(StoreError::new(StoreErrorKind::Unavailable("memory store switched off".into())));
        }
        state.version = version;
        state.history.push(version);
        Ok(())
    }
}
