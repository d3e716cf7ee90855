// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::model::FileId;

#[derive(Error, Debug)]
pub enum PchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Dependency collection failed for project part '{project_part}': {reason}")]
    Collection {
        project_part: String,
        reason: String,
    },

    #[error("PCH build {key} failed with exit code {code}: {stderr}")]
    BuildFailed {
        key: String,
        code: i32,
        stderr: String,
    },

    #[error("Unknown file id: {0:?}")]
    UnknownFile(FileId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PchError>;
