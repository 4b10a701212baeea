//! Errors surfaced by the driver.

use keymaker_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to parse script: {0}")]
    Script(#[source] serde_json::Error),
    #[error("Failed to write report: {0}")]
    Report(#[source] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
