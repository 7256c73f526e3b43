#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;
use vimnav_runtime::ConfigError;

use crate::script::ScriptError;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot read script {path}: {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("settings: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Process exit code: 2 for bad input, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Script(_) | Self::Config(_) | Self::ReadScript { .. } => 2,
            Self::Io(_) | Self::Json(_) => 1,
        }
    }
}
