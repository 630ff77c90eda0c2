use std::path::PathBuf;

use thiserror::Error;

use crate::hardware::platform::ToolKind;
use crate::hardware::units::UnitError;

/// Everything that can go wrong while collecting one inventory kind.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0:?} is unsupported, host machine should either be macOS, Windows or any Linux distro")]
    UnsupportedPlatform(String),

    #[error("{kind} library {path:?} doesn't exist")]
    ToolNotFound { kind: ToolKind, path: PathBuf },

    #[error("failed to run {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected {source_name} output: {reason}")]
    Parse { source_name: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("native memory query failed: {0}")]
    NativeCall(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Unit(#[from] UnitError),
}

impl InventoryError {
    pub fn parse(source_name: &'static str, reason: impl Into<String>) -> Self {
        InventoryError::Parse {
            source_name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
