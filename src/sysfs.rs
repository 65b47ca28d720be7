use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::error::{PartsError, Result};

/// First line of `path` without its terminator, or `None` if unreadable.
pub fn read_line(path: &Path) -> Option<String> {
    let f = fs::File::open(path).ok()?;
    let mut line = String::new();
    BufReader::with_capacity(1024, f).read_line(&mut line).ok()?;
    let trimmed = line.trim_end_matches(['\n', '\r']);
    Some(trimmed.to_string())
}

pub fn get_file_value(path: &Path, default: &str) -> String {
    read_line(path).unwrap_or_else(|| default.to_string())
}

/// Write `value` verbatim, replacing whatever the node held.
pub fn write_value(path: &Path, value: &str) -> Result<()> {
    fs::write(path, value.as_bytes()).map_err(|e| PartsError::io(path, e))
}

pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

pub fn file_writable(path: &Path) -> bool {
    file_exists(path) && OpenOptions::new().write(true).open(path).is_ok()
}

/// Returns `Ok(true)` when a write actually happened.
pub fn write_str_if_needed(
    path: &Path,
    target: &str,
    cache: &mut HashMap<PathBuf, String>,
    force_check_current: bool,
) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    if let Some(last) = cache.get(path) {
        if !force_check_current && last == target {
            return Ok(false);
        }
    }

    if force_check_current {
        if let Some(cur) = read_line(path) {
            if cur.trim() == target {
                cache.insert(path.to_path_buf(), target.to_string());
                return Ok(false);
            }
        }
    }

    write_value(path, target)?;
    cache.insert(path.to_path_buf(), target.to_string());
    Ok(true)
}
