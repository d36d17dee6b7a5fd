//! Error types for SQLite schema operations.
//!
//! Provides a unified error type covering database access, metadata
//! resolution, and migration failures.

use tablemap_core::MappingError;
use tablemap_engine::EngineError;
use thiserror::Error;

/// Errors that can occur during SQLite schema operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Identifier escaping or bound-builder lookup failure.
    #[error("engine error: {0}")]
    EngineError(#[from] EngineError),

    /// Table resolution failure.
    #[error("mapping error: {0}")]
    MappingError(#[from] MappingError),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
