use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartsError {
    #[error("{path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{cmd}` failed: {detail}")]
    Command { cmd: String, detail: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown preference key `{0}`")]
    UnknownKey(String),
}

impl PartsError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PartsError> = std::result::Result<T, E>;
