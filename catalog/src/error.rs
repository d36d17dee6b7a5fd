//! Error types for catalog operations.
//!
//! Covers every failure mode of loading a catalog: I/O, JSON and YAML
//! parsing, duplicate or invalid type declarations, and exhausted loader
//! fallback chains.

use std::path::PathBuf;

use tablemap_core::ValidationError;
use thiserror::Error;

/// Errors that can occur while loading or saving catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Two sources declare the same type.
    #[error("type '{name}' is declared more than once (again in {})", .path.display())]
    DuplicateType { name: String, path: PathBuf },

    /// A declaration failed model validation.
    #[error("invalid model: {0}")]
    InvalidModel(#[from] ValidationError),

    /// The file extension is neither JSON nor YAML.
    #[error("unsupported catalog file: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// All configured loader sources failed.
    #[error("no model sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
