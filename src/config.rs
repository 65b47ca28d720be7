// Files
pub const CONFIG_PATH: &str = "/data/adb/modules/device_parts/config/parts.json";
pub const PREFS_PATH: &str = "/data/adb/modules/device_parts/config/prefs.json";

// Gesture preference keys
pub const GESTURE_PICK_UP_KEY: &str = "gesture_pick_up";
pub const GESTURE_HAND_WAVE_KEY: &str = "gesture_hand_wave";
pub const GESTURE_POCKET_KEY: &str = "gesture_pocket";

pub const GESTURE_KEYS: &[&str] = &[GESTURE_PICK_UP_KEY, GESTURE_HAND_WAVE_KEY, GESTURE_POCKET_KEY];

// Doze
pub const DOZE_ENABLED: &str = "doze_enabled";
pub const DOZE_SERVICE: &str = "org.omnirom.device/.DozeService";
pub const DOZE_INTENT: &str = "com.android.systemui.doze.pulse";

// Custom broadcast sent when a parts toggle changes
pub const CUST_INTENT: &str = "org.omnirom.device.CUST_UPDATE";
pub const CUST_INTENT_EXTRA: &str = "enabled";

// Shell binaries
pub const AM_BIN: &str = "/system/bin/am";
pub const SETTINGS_BIN: &str = "/system/bin/settings";

// Watcher
pub const PREFS_POLL_MS: u64 = 1500;
