use std::{
    collections::BTreeMap,
    fs,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{PartsError, Result},
    parts_config::{ensure_parent_dir, NodeValue, PartsConfig},
};

/// Persisted user settings.
pub trait PreferenceStore {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_bool(&mut self, key: &str, value: bool) -> Result<()>;
    fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    fn get(&self, key: &str) -> bool {
        self.get_bool(key).unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Str(String),
}

/// `prefs.json` backed store. Every `set_*` rewrites the file atomically.
#[derive(Debug)]
pub struct JsonPreferences {
    path: PathBuf,
    values: BTreeMap<String, PrefValue>,
}

impl JsonPreferences {
    /// Missing file means "nothing set yet".
    pub fn open(path: &Path) -> Result<Self> {
        let values = match fs::read_to_string(path) {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(PartsError::io(path, e)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    fn put(&mut self, key: &str, value: PrefValue) -> Result<()> {
        let prev = self.values.insert(key.to_string(), value);
        if let Err(e) = self.persist() {
            // Keep memory in sync with disk.
            match prev {
                Some(v) => self.values.insert(key.to_string(), v),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        let data = serde_json::to_string_pretty(&self.values)?;
        fs::write(&tmp, data.as_bytes()).map_err(|e| PartsError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| PartsError::io(&self.path, e))?;
        Ok(())
    }
}

impl PreferenceStore for JsonPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            PrefValue::Bool(b) => Some(*b),
            PrefValue::Str(_) => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            PrefValue::Str(s) => Some(s.clone()),
            PrefValue::Bool(_) => None,
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.put(key, PrefValue::Bool(value))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key, PrefValue::Str(value.to_string()))
    }
}

/// Stored boolean, or the node default from `parts.json`, or `false`.
pub fn is_preference_enabled(store: &dyn PreferenceStore, config: &PartsConfig, key: &str) -> bool {
    store.get_bool(key).unwrap_or_else(|| match config.default_for(key) {
        Some(NodeValue::Bool(b)) => *b,
        _ => false,
    })
}

/// Stored string, or the node default from `parts.json`.
pub fn get_preference_string(
    store: &dyn PreferenceStore,
    config: &PartsConfig,
    key: &str,
) -> Option<String> {
    store.get_string(key).or_else(|| match config.default_for(key) {
        Some(NodeValue::Str(s)) => Some(s.clone()),
        _ => None,
    })
}

/// Value to write to a node: stored preference if present, else the default.
pub fn node_value(
    store: &dyn PreferenceStore,
    config: &PartsConfig,
    key: &str,
) -> Option<NodeValue> {
    match config.default_for(key)? {
        NodeValue::Bool(_) => Some(NodeValue::Bool(is_preference_enabled(store, config, key))),
        NodeValue::Str(_) => get_preference_string(store, config, key).map(NodeValue::Str),
    }
}
