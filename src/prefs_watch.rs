use std::{
    fs,
    path::PathBuf,
    thread::{self, JoinHandle},
    time::{Duration, SystemTime},
};

use crate::{
    config::PREFS_POLL_MS,
    gestures,
    nodes::NodeWriter,
    parts_config::PartsConfig,
    prefs::JsonPreferences,
    services,
    shell::CommandRunner,
    state::{self, SharedState},
};

/// Follows `prefs.json` and keeps nodes and the doze service in line with it.
pub struct PrefsWatcher<R> {
    path: PathBuf,
    config: PartsConfig,
    runner: R,
    shared: SharedState,
    nodes: NodeWriter,
    last_mtime: Option<SystemTime>,
    /// Set after the first pass; later passes need an mtime change.
    synced: bool,
}

impl<R: CommandRunner> PrefsWatcher<R> {
    pub fn new(path: PathBuf, config: PartsConfig, runner: R, shared: SharedState) -> Self {
        Self {
            path,
            config,
            runner,
            shared,
            nodes: NodeWriter::new(),
            last_mtime: None,
            synced: false,
        }
    }

    /// Returns `true` when a change was picked up. A file that fails to load
    /// is not retried until its mtime moves.
    pub fn poll(&mut self) -> bool {
        let mtime = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        if self.synced && mtime == self.last_mtime {
            return false;
        }
        self.last_mtime = mtime;
        self.synced = true;
        self.sync();
        true
    }

    fn sync(&mut self) {
        let store = match JsonPreferences::open(&self.path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("PREFS: reload failed: {}", e);
                state::write(&self.shared).last_error = Some(e.to_string());
                return;
            }
        };

        let written = self.nodes.restore_all(&self.config, &store);
        let wanted = gestures::doze_service_wanted(&self.runner, &store, &self.config.doze);
        let current = state::read(&self.shared).doze_running;

        let mut last_error = None;
        let mut running = current;
        if current != Some(wanted) {
            match services::set_running(&self.runner, &self.config.doze.service, wanted) {
                Ok(()) => {
                    log::info!("DOZE: service {}", if wanted { "started" } else { "stopped" });
                    running = Some(wanted);
                }
                Err(e) => {
                    log::warn!("DOZE: {}", e);
                    last_error = Some(e.to_string());
                }
            }
        }

        let mut s = state::write(&self.shared);
        s.prefs_rev = s.prefs_rev.wrapping_add(1);
        s.doze_running = running;
        s.nodes_written += written;
        s.last_error = last_error;
    }
}

pub fn spawn<R: CommandRunner + Send + 'static>(mut watcher: PrefsWatcher<R>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        watcher.poll();
        // Preference edits are rare; a slow poll keeps wakeups down.
        thread::sleep(Duration::from_millis(PREFS_POLL_MS));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AM_BIN, DOZE_SERVICE, GESTURE_POCKET_KEY},
        prefs::PreferenceStore,
        shell::tests::RecordingRunner,
    };

    fn bump_mtime(path: &std::path::Path, secs: u64) {
        let f = fs::File::options().write(true).open(path).unwrap();
        f.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn starts_then_stops_doze_service_on_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        let mut prefs = JsonPreferences::open(&path).unwrap();
        prefs.set_bool(GESTURE_POCKET_KEY, true).unwrap();
        bump_mtime(&path, 1_000);

        let shared = state::shared();
        let runner = RecordingRunner::default().reply(Ok("1".to_string()));
        let mut w =
            PrefsWatcher::new(path.clone(), PartsConfig::default(), runner, shared.clone());

        assert!(w.poll());
        assert_eq!(state::read(&shared).doze_running, Some(true));
        assert_eq!(
            w.runner.calls().last().cloned(),
            Some(format!("{} start-service --user current -n {}", AM_BIN, DOZE_SERVICE))
        );

        // Untouched file: nothing to do.
        let before = w.runner.calls().len();
        assert!(!w.poll());
        assert_eq!(w.runner.calls().len(), before);

        prefs.set_bool(GESTURE_POCKET_KEY, false).unwrap();
        bump_mtime(&path, 2_000);
        assert!(w.poll());
        let s = state::read(&shared);
        assert_eq!(s.doze_running, Some(false));
        assert_eq!(s.prefs_rev, 2);
        assert!(s.last_error.is_none());
    }

    #[test]
    fn unchanged_wanted_state_does_not_touch_service() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{}").unwrap();
        bump_mtime(&path, 1_000);

        let shared = state::shared();
        let runner = RecordingRunner::default();
        let mut w =
            PrefsWatcher::new(path.clone(), PartsConfig::default(), runner, shared.clone());
        assert!(w.poll());
        assert_eq!(w.runner.calls().len(), 1);

        fs::write(&path, r#"{ "unrelated": true }"#).unwrap();
        bump_mtime(&path, 2_000);
        assert!(w.poll());
        assert_eq!(w.runner.calls().len(), 1);
        assert_eq!(state::read(&shared).prefs_rev, 2);
    }

    #[test]
    fn corrupt_prefs_are_reported_once_per_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{").unwrap();
        bump_mtime(&path, 1_000);

        let shared = state::shared();
        let runner = RecordingRunner::default();
        let mut w =
            PrefsWatcher::new(path.clone(), PartsConfig::default(), runner, shared.clone());
        assert!(w.poll());
        assert!(state::read(&shared).last_error.is_some());
        assert!(w.runner.calls().is_empty());

        // Same broken file: no reload, no new warning.
        assert!(!w.poll());
        assert!(!w.poll());
        assert_eq!(state::read(&shared).prefs_rev, 0);

        fs::write(&path, "{}").unwrap();
        bump_mtime(&path, 2_000);
        assert!(w.poll());
        let s = state::read(&shared);
        assert!(s.last_error.is_none());
        assert_eq!(s.prefs_rev, 1);
        assert_eq!(s.doze_running, Some(false));
    }
}
