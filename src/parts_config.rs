use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    config::{CUST_INTENT, CUST_INTENT_EXTRA, DOZE_INTENT, DOZE_SERVICE, GESTURE_KEYS},
    error::{PartsError, Result},
};

/// Device description loaded from `parts.json`.
///
/// Node paths are device specific and always come from this file; nothing in
/// the daemon guesses them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartsConfig {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    #[serde(default)]
    pub dependencies: Vec<DependencyRule>,

    #[serde(default)]
    pub doze: DozeConfig,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for PartsConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            dependencies: Vec::new(),
            doze: DozeConfig::default(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    pub key: String,
    pub path: PathBuf,
    pub default: NodeValue,
}

/// Default value of a node; also decides how the stored preference is read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NodeValue {
    Bool(bool),
    Str(String),
}

impl NodeValue {
    /// Text written to the sysfs node.
    pub fn to_node_string(&self) -> String {
        match self {
            NodeValue::Bool(true) => "1".to_string(),
            NodeValue::Bool(false) => "0".to_string(),
            NodeValue::Str(s) => s.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyRule {
    /// Dependent toggle.
    pub key: String,
    pub requires: Requirement,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Met while any of the listed boolean preferences is on.
    AnyEnabled(Vec<String>),
    /// Met while the secure `doze_enabled` setting is on.
    DozeEnabled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DozeConfig {
    pub service: String,
    pub pulse_action: String,
    pub cust_action: String,
    pub cust_extra: String,
    /// Gesture toggles that keep the doze service alive.
    pub gestures: Vec<String>,
    /// Preference whose changes are announced with the custom intent.
    pub cust_key: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for DozeConfig {
    fn default() -> Self {
        Self {
            service: DOZE_SERVICE.to_string(),
            pulse_action: DOZE_INTENT.to_string(),
            cust_action: CUST_INTENT.to_string(),
            cust_extra: CUST_INTENT_EXTRA.to_string(),
            gestures: GESTURE_KEYS.iter().map(|k| k.to_string()).collect(),
            cust_key: None,
            extra: BTreeMap::new(),
        }
    }
}

impl PartsConfig {
    pub fn node(&self, key: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn default_for(&self, key: &str) -> Option<&NodeValue> {
        self.node(key).map(|n| &n.default)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for n in &self.nodes {
            if n.key.trim().is_empty() {
                return Err(PartsError::InvalidConfig("node with empty key".to_string()));
            }
            if !seen.insert(n.key.as_str()) {
                return Err(PartsError::InvalidConfig(format!("duplicate node `{}`", n.key)));
            }
        }

        let dependents: BTreeSet<&str> =
            self.dependencies.iter().map(|d| d.key.as_str()).collect();
        if dependents.len() != self.dependencies.len() {
            return Err(PartsError::InvalidConfig("duplicate dependency rule".to_string()));
        }

        // Only one level of gating: a requirement may not itself be gated.
        for d in &self.dependencies {
            if let Requirement::AnyEnabled(keys) = &d.requires {
                if keys.is_empty() {
                    return Err(PartsError::InvalidConfig(format!(
                        "`{}` requires an empty key list",
                        d.key
                    )));
                }
                if let Some(k) = keys.iter().find(|k| dependents.contains(k.as_str())) {
                    return Err(PartsError::InvalidConfig(format!(
                        "`{}` depends on dependent toggle `{}`",
                        d.key, k
                    )));
                }
            }
        }
        Ok(())
    }
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PartsError::io(parent, e))?;
    }
    Ok(())
}

/// Load `parts.json`. A missing file is created with defaults; a file that
/// cannot be read or fails validation is left untouched and defaults are used
/// in memory.
pub fn load_or_init(path: &Path) -> PartsConfig {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("CFG: {} missing, writing defaults", path.display());
            let def = PartsConfig::default();
            if let Err(e) = write_config_atomic(path, &def) {
                log::warn!("CFG: cannot persist default: {}", e);
            }
            return def;
        }
        Err(e) => {
            log::warn!("CFG: {} (using defaults)", PartsError::io(path, e));
            return PartsConfig::default();
        }
    };

    let parsed = serde_json::from_str::<PartsConfig>(&text)
        .map_err(PartsError::from)
        .and_then(|cfg| cfg.validate().map(|_| cfg));
    match parsed {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("CFG: {}: {} (using defaults, file kept)", path.display(), e);
            PartsConfig::default()
        }
    }
}

pub fn write_config_atomic(path: &Path, cfg: &PartsConfig) -> Result<()> {
    ensure_parent_dir(path)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    let data = serde_json::to_string_pretty(cfg)?;
    fs::write(&tmp, data.as_bytes()).map_err(|e| PartsError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| PartsError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GESTURE_HAND_WAVE_KEY, GESTURE_PICK_UP_KEY};

    const SAMPLE: &str = r#"{
        "nodes": [
            { "key": "buttons_swap", "path": "/sys/keys/swap", "default": false },
            { "key": "vibrator_strength", "path": "/sys/vib/level", "default": "2" }
        ],
        "dependencies": [
            { "key": "doze_pulse_on_pickup", "requires": { "any_enabled": ["gesture_pick_up"] } },
            { "key": "gesture_pocket", "requires": "doze_enabled" }
        ],
        "vendor_note": "kept"
    }"#;

    #[test]
    fn parses_nodes_rules_and_keeps_unknown_fields() {
        let cfg: PartsConfig = serde_json::from_str(SAMPLE).unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.default_for("buttons_swap"), Some(&NodeValue::Bool(false)));
        assert_eq!(
            cfg.default_for("vibrator_strength"),
            Some(&NodeValue::Str("2".to_string()))
        );
        assert_eq!(cfg.dependencies[1].requires, Requirement::DozeEnabled);
        assert_eq!(cfg.doze.service, DOZE_SERVICE);
        assert_eq!(cfg.doze.cust_key, None);
        assert!(cfg.extra.contains_key("vendor_note"));
    }

    #[test]
    fn shipped_example_is_valid() {
        let cfg: PartsConfig =
            serde_json::from_str(include_str!("../config/parts.example.json")).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.nodes.len(), 2);
        assert_eq!(cfg.doze.gestures, GESTURE_KEYS);
    }

    #[test]
    fn rejects_chained_dependencies() {
        let cfg = PartsConfig {
            dependencies: vec![
                DependencyRule {
                    key: GESTURE_PICK_UP_KEY.to_string(),
                    requires: Requirement::DozeEnabled,
                },
                DependencyRule {
                    key: GESTURE_HAND_WAVE_KEY.to_string(),
                    requires: Requirement::AnyEnabled(vec![GESTURE_PICK_UP_KEY.to_string()]),
                },
            ],
            ..PartsConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(PartsError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_duplicate_nodes() {
        let node = NodeConfig {
            key: "buttons_swap".to_string(),
            path: PathBuf::from("/sys/keys/swap"),
            default: NodeValue::Bool(false),
        };
        let cfg = PartsConfig {
            nodes: vec![node.clone(), node],
            ..PartsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join("parts.json");

        let cfg = load_or_init(&path);
        assert!(cfg.nodes.is_empty());

        let again: PartsConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(again.doze.gestures.len(), GESTURE_KEYS.len());
    }

    #[test]
    fn broken_file_is_left_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("parts.json");
        fs::write(&path, "{ not json").unwrap();

        let cfg = load_or_init(&path);
        assert!(cfg.nodes.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn invalid_config_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("parts.json");
        let text = r#"{
            "nodes": [
                { "key": "buttons_swap", "path": "/sys/keys/swap", "default": false },
                { "key": "buttons_swap", "path": "/sys/keys/swap2", "default": true }
            ]
        }"#;
        fs::write(&path, text).unwrap();

        let cfg = load_or_init(&path);
        assert!(cfg.nodes.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
        assert!(!dir.path().join("parts.json.tmp").exists());
    }

    #[test]
    fn node_strings() {
        assert_eq!(NodeValue::Bool(true).to_node_string(), "1");
        assert_eq!(NodeValue::Bool(false).to_node_string(), "0");
        assert_eq!(NodeValue::Str("3".into()).to_node_string(), "3");
    }
}
