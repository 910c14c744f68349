//! Errors raised while loading race cards and config files.
//!
//! The simulation itself never fails; bad rows degrade to defaults.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
