use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug, Default)]
pub struct DaemonState {
    /// Bumped on every handled preference change.
    pub prefs_rev: u64,
    /// Last state we put the doze service in; `None` before the first check.
    pub doze_running: Option<bool>,
    pub nodes_written: usize,
    pub last_error: Option<String>,
}

pub type SharedState = Arc<RwLock<DaemonState>>;

pub fn shared() -> SharedState {
    Arc::new(RwLock::new(DaemonState::default()))
}

// A panicked writer leaves plain data behind; keep going with it.
pub fn read(s: &SharedState) -> RwLockReadGuard<'_, DaemonState> {
    s.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write(s: &SharedState) -> RwLockWriteGuard<'_, DaemonState> {
    s.write().unwrap_or_else(PoisonError::into_inner)
}
