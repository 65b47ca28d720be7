use crate::{
    config::{GESTURE_HAND_WAVE_KEY, GESTURE_PICK_UP_KEY, GESTURE_POCKET_KEY},
    error::Result,
    parts_config::DozeConfig,
    prefs::PreferenceStore,
    secure, services,
    shell::CommandRunner,
};

pub fn pick_up_enabled(store: &dyn PreferenceStore) -> bool {
    store.get(GESTURE_PICK_UP_KEY)
}

pub fn hand_wave_enabled(store: &dyn PreferenceStore) -> bool {
    store.get(GESTURE_HAND_WAVE_KEY)
}

pub fn pocket_enabled(store: &dyn PreferenceStore) -> bool {
    store.get(GESTURE_POCKET_KEY)
}

/// Any of the configured gesture toggles is on.
pub fn sensors_enabled(store: &dyn PreferenceStore, doze: &DozeConfig) -> bool {
    doze.gestures.iter().any(|k| store.get(k))
}

pub fn doze_service_wanted(
    runner: &dyn CommandRunner,
    store: &dyn PreferenceStore,
    doze: &DozeConfig,
) -> bool {
    sensors_enabled(store, doze) && secure::is_doze_enabled(runner)
}

/// Start the doze service when doze and at least one gesture are on, stop it
/// otherwise. Returns the state asked for.
pub fn check_doze_service(
    runner: &dyn CommandRunner,
    store: &dyn PreferenceStore,
    doze: &DozeConfig,
) -> Result<bool> {
    let wanted = doze_service_wanted(runner, store, doze);
    services::set_running(runner, &doze.service, wanted)?;
    Ok(wanted)
}
