use std::{collections::HashMap, path::PathBuf};

use crate::{
    error::{PartsError, Result},
    parts_config::PartsConfig,
    prefs::{node_value, PreferenceStore},
    sysfs,
};

/// Writes preference values to their sysfs nodes, skipping unchanged ones.
#[derive(Debug, Default)]
pub struct NodeWriter {
    cache: HashMap<PathBuf, String>,
}

impl NodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the current value of `key` to its node. `Ok(false)` when nothing
    /// was written (node absent or already up to date).
    pub fn apply(
        &mut self,
        config: &PartsConfig,
        store: &dyn PreferenceStore,
        key: &str,
    ) -> Result<bool> {
        let node = config
            .node(key)
            .ok_or_else(|| PartsError::UnknownKey(key.to_string()))?;
        let Some(value) = node_value(store, config, key) else {
            return Ok(false);
        };
        if !sysfs::file_writable(&node.path) {
            log::debug!("NODE: {} not writable ({})", key, node.path.display());
            return Ok(false);
        }
        let text = value.to_node_string();
        let wrote = sysfs::write_str_if_needed(&node.path, &text, &mut self.cache, true)?;
        if wrote {
            log::info!("NODE: {} -> {}", key, text);
        }
        Ok(wrote)
    }

    /// Boot-time restore of every configured node. Failures are logged and do
    /// not stop the remaining nodes. Returns the number of nodes written.
    pub fn restore_all(&mut self, config: &PartsConfig, store: &dyn PreferenceStore) -> usize {
        let mut written = 0;
        for node in &config.nodes {
            match self.apply(config, store, &node.key) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => log::warn!("NODE: restore {} failed: {}", node.key, e),
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parts_config::{NodeConfig, NodeValue},
        prefs::tests::MemoryPreferences,
    };
    use std::fs;

    fn config(dir: &std::path::Path) -> PartsConfig {
        PartsConfig {
            nodes: vec![
                NodeConfig {
                    key: "buttons_swap".to_string(),
                    path: dir.join("swap"),
                    default: NodeValue::Bool(false),
                },
                NodeConfig {
                    key: "vibrator_strength".to_string(),
                    path: dir.join("level"),
                    default: NodeValue::Str("2".to_string()),
                },
                NodeConfig {
                    key: "missing".to_string(),
                    path: dir.join("absent"),
                    default: NodeValue::Bool(true),
                },
            ],
            ..PartsConfig::default()
        }
    }

    #[test]
    fn restore_writes_stored_values_and_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = config(dir.path());
        fs::write(dir.path().join("swap"), "0\n").unwrap();
        fs::write(dir.path().join("level"), "0\n").unwrap();

        let store = MemoryPreferences::with(&[("buttons_swap", true)]);
        let mut w = NodeWriter::new();
        assert_eq!(w.restore_all(&cfg, &store), 2);
        assert_eq!(sysfs::read_line(&dir.path().join("swap")).as_deref(), Some("1"));
        assert_eq!(sysfs::read_line(&dir.path().join("level")).as_deref(), Some("2"));
        assert!(!dir.path().join("absent").exists());

        // Second pass finds everything in place.
        assert_eq!(w.restore_all(&cfg, &store), 0);
    }

    #[test]
    fn apply_unknown_key_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = config(dir.path());
        let store = MemoryPreferences::default();
        let err = NodeWriter::new().apply(&cfg, &store, "nope").unwrap_err();
        assert!(matches!(err, PartsError::UnknownKey(k) if k == "nope"));
    }
}
