//! Settings-screen session: applies tracker decisions to toggles and the
//! preference store.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    dependency::{DependencyInput, DependencyTracker, Reconciliation, Transition},
    error::{PartsError, Result},
    parts_config::{ensure_parent_dir, DependencyRule, Requirement},
    prefs::PreferenceStore,
    secure,
    shell::CommandRunner,
};

/// UI control a dependent preference is shown through.
pub trait ToggleView {
    fn is_enabled(&self) -> bool;
    fn set_checked(&mut self, checked: bool);
    fn set_enabled(&mut self, enabled: bool);
}

pub trait DependencyEvaluator {
    /// Keys of all gated toggles.
    fn dependents(&self) -> Vec<String>;
    fn is_met(&self, key: &str, store: &dyn PreferenceStore) -> bool;
}

/// Evaluates the `dependencies` table of `parts.json`.
pub struct RuleEvaluator<'a> {
    rules: &'a [DependencyRule],
    runner: &'a dyn CommandRunner,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(rules: &'a [DependencyRule], runner: &'a dyn CommandRunner) -> Self {
        Self { rules, runner }
    }
}

impl DependencyEvaluator for RuleEvaluator<'_> {
    fn dependents(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.key.clone()).collect()
    }

    fn is_met(&self, key: &str, store: &dyn PreferenceStore) -> bool {
        let Some(rule) = self.rules.iter().find(|r| r.key == key) else {
            return true;
        };
        match &rule.requires {
            Requirement::AnyEnabled(keys) => keys.iter().any(|k| store.get(k)),
            Requirement::DozeEnabled => secure::is_doze_enabled(self.runner),
        }
    }
}

/// Plain toggle state, used where there is no real widget (CLI, tests).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    pub checked: bool,
    pub enabled: bool,
}

impl Default for ToggleState {
    fn default() -> Self {
        Self {
            checked: false,
            enabled: true,
        }
    }
}

impl ToggleView for ToggleState {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

pub struct SettingsSession<S> {
    store: S,
    tracker: DependencyTracker,
    /// Store writes that failed and still need to land.
    pending: BTreeMap<String, bool>,
}

impl<S: PreferenceStore> SettingsSession<S> {
    pub fn new(store: S) -> Self {
        Self::resume(store, DependencyTracker::new(), BTreeMap::new())
    }

    pub fn resume(store: S, tracker: DependencyTracker, pending: BTreeMap<String, bool>) -> Self {
        Self {
            store,
            tracker,
            pending,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    pub fn pending(&self) -> &BTreeMap<String, bool> {
        &self.pending
    }

    pub fn into_parts(self) -> (S, DependencyTracker, BTreeMap<String, bool>) {
        (self.store, self.tracker, self.pending)
    }

    /// Reconcile one dependent toggle and push the result to `view` and the
    /// store. The view is always updated; a failed store write is queued and
    /// a failed restore keeps the forced-off record so it is retried.
    pub fn update_dependent(
        &mut self,
        key: &str,
        dependency_met: bool,
        view: &mut dyn ToggleView,
    ) -> Reconciliation {
        let input = DependencyInput {
            dependency_met,
            current_stored_value: self.store.get(key),
            toggle_enabled: view.is_enabled(),
        };
        let r = self.tracker.plan(key, input);

        view.set_enabled(r.display_enabled);
        view.set_checked(r.display_checked);

        let written = match r.store_update {
            Some(v) => self.write(key, v),
            None => true,
        };
        if written || r.transition != Transition::Restored {
            self.tracker.commit(key, &r);
        }
        if r.transition != Transition::Unchanged {
            log::info!("PREFS: {} {:?} (stored={})", key, r.transition, input.current_stored_value);
        }
        r
    }

    /// Reconcile every dependent known to `eval`. Toggles without a view yet
    /// get a default one.
    pub fn refresh<V: ToggleView + Default>(
        &mut self,
        eval: &dyn DependencyEvaluator,
        views: &mut BTreeMap<String, V>,
    ) -> Vec<(String, Reconciliation)> {
        let mut out = Vec::new();
        for key in eval.dependents() {
            let met = eval.is_met(&key, &self.store);
            let view = views.entry(key.clone()).or_default();
            let r = self.update_dependent(&key, met, view);
            out.push((key, r));
        }
        out
    }

    /// Retry queued writes; returns how many are still pending.
    pub fn flush_pending(&mut self) -> usize {
        let queued: Vec<(String, bool)> =
            self.pending.iter().map(|(k, v)| (k.clone(), *v)).collect();
        for (key, value) in queued {
            self.write(&key, value);
        }
        self.pending.len()
    }

    fn write(&mut self, key: &str, value: bool) -> bool {
        match self.store.set_bool(key, value) {
            Ok(()) => {
                self.pending.remove(key);
                true
            }
            Err(e) => {
                log::warn!("PREFS: write {}={} failed: {} (queued)", key, value, e);
                self.pending.insert(key.to_string(), value);
                false
            }
        }
    }
}

/// Session state carried between CLI invocations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub tracker: DependencyTracker,
    #[serde(default)]
    pub toggles: BTreeMap<String, ToggleState>,
    #[serde(default)]
    pub pending: BTreeMap<String, bool>,
}

impl SessionSnapshot {
    /// A missing file starts a fresh session.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PartsError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let tmp = PathBuf::from(format!("{}.tmp", path.display()));
        fs::write(&tmp, serde_json::to_string_pretty(self)?).map_err(|e| PartsError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| PartsError::io(path, e))
    }
}
