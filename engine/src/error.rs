use tablemap_core::MappingError;
use thiserror::Error;

use crate::Dialect;

/// Errors raised by [`Engine`](crate::Engine) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The identifier is empty or contains the dialect's escape-end
    /// character, so wrapping it would produce invalid SQL.
    #[error("identifier '{identifier}' cannot be escaped for {dialect}")]
    UnsupportedIdentifier { identifier: String, dialect: Dialect },

    /// A metadata lookup was requested but no table builder is bound.
    #[error("no table builder is bound to the {0} engine")]
    NoBuilder(Dialect),

    /// Resolution failed in the bound table builder.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A dialect name could not be parsed.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
