//! Error types for the catalog engine
//!
//! Only whole-run failures surface as errors here. Per-entry failures
//! (unreadable files, unresolvable links, malformed artifacts) are soft:
//! the affected entry is skipped and the run continues.

use std::io;
use thiserror::Error;

/// Catalog error type
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Output directory not writable: {0}")]
    OutputDir(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
