//! Dependent toggle reconciliation.
//!
//! A dependent toggle is only user-controllable while some external condition
//! holds (a gesture sensor is on, doze is enabled, ...). While the condition is
//! unmet the toggle is shown off and disabled; if the user had it on, that
//! choice is remembered and put back once the condition clears.
//!
//! [`DependencyTracker::plan`] is pure. [`DependencyTracker::commit`] stores
//! the planned record. [`DependencyTracker::reconcile`] does both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-key memory of the user's choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyState {
    pub last_known_value: bool,
    pub was_forced_off: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DependencyInput {
    pub dependency_met: bool,
    pub current_stored_value: bool,
    pub toggle_enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Unchanged,
    ForcedOff,
    Restored,
}

/// What the toggle should show and what, if anything, must be persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub display_checked: bool,
    pub display_enabled: bool,
    pub store_update: Option<bool>,
    pub transition: Transition,
    /// Record to keep for the key after this step; `None` leaves it absent.
    pub next: Option<DependencyState>,
}

/// Owned by one settings session; never shared between screens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTracker {
    states: BTreeMap<String, DependencyState>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &str) -> Option<DependencyState> {
        self.states.get(key).copied()
    }

    pub fn is_forced_off(&self, key: &str) -> bool {
        self.state(key).map(|s| s.was_forced_off).unwrap_or(false)
    }

    pub fn plan(&self, key: &str, input: DependencyInput) -> Reconciliation {
        let prev = self.state(key);

        if input.dependency_met {
            return match prev {
                Some(st) if st.was_forced_off => Reconciliation {
                    display_checked: st.last_known_value,
                    display_enabled: true,
                    store_update: (st.last_known_value != input.current_stored_value)
                        .then_some(st.last_known_value),
                    transition: Transition::Restored,
                    next: Some(DependencyState {
                        last_known_value: input.current_stored_value,
                        was_forced_off: false,
                    }),
                },
                _ => Reconciliation {
                    display_checked: input.current_stored_value,
                    display_enabled: true,
                    store_update: None,
                    transition: Transition::Unchanged,
                    next: prev,
                },
            };
        }

        // Only remember a value the user could actually see and change.
        let (transition, next) = if input.toggle_enabled && input.current_stored_value {
            (
                Transition::ForcedOff,
                Some(DependencyState {
                    last_known_value: true,
                    was_forced_off: true,
                }),
            )
        } else {
            (Transition::Unchanged, prev)
        };

        Reconciliation {
            display_checked: false,
            display_enabled: false,
            // The store keeps the user's choice; only the view is forced off.
            store_update: None,
            transition,
            next,
        }
    }

    pub fn commit(&mut self, key: &str, r: &Reconciliation) {
        if let Some(st) = r.next {
            self.states.insert(key.to_string(), st);
        }
    }

    pub fn reconcile(&mut self, key: &str, input: DependencyInput) -> Reconciliation {
        let r = self.plan(key, input);
        self.commit(key, &r);
        r
    }
}
