//! Error types for table resolution.
//!
//! Every variant is a local resolution failure reported synchronously to the
//! caller. Nothing is retried and nothing partially resolved is cached.

use thiserror::Error;

/// Errors raised while walking, classifying, or resolving mapped types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A type, base type, navigation target, or collection element was never
    /// registered.
    #[error("type '{0}' is not registered with the table builder")]
    UnmappedType(String),

    /// Zero or several members satisfy the primary-key convention.
    #[error("table '{table}' must have exactly one primary key, found {found}")]
    AmbiguousPrimaryKey { table: String, found: usize },

    /// Two members resolve to the same column name in one table.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumnName { table: String, column: String },

    /// A type was re-entered while in progress and the placeholder could not
    /// supply what the caller needed.
    #[error("cyclic resolution of type '{type_name}': {reason}")]
    CyclicResolution { type_name: String, reason: String },

    /// The hierarchy walk cannot terminate at the configured base marker.
    #[error("misconfigured hierarchy for '{type_name}': {reason}")]
    MisconfiguredHierarchy { type_name: String, reason: String },

    /// A member matches several classification rules at once.
    #[error("member '{type_name}.{member}' is ambiguous: {reason}")]
    AmbiguousMember {
        type_name: String,
        member: String,
        reason: String,
    },

    /// A member's declared type has no mapping (e.g. an array of scalars).
    #[error("member '{type_name}.{member}' has unsupported type '{member_type}'")]
    UnsupportedMember {
        type_name: String,
        member: String,
        member_type: String,
    },

    /// The requested member does not exist on the type or its ancestors.
    #[error("type '{type_name}' has no member '{member}'")]
    UnknownMember { type_name: String, member: String },

    /// The member exists but maps to no column.
    #[error("member '{type_name}.{member}' is not a column: {reason}")]
    NotAColumn {
        type_name: String,
        member: String,
        reason: &'static str,
    },

    /// A single navigation has no foreign-key sibling to report as its column.
    #[error("navigation '{type_name}.{member}' has no foreign-key column (expected '{expected}')")]
    MissingForeignKey {
        type_name: String,
        member: String,
        expected: String,
    },

    /// A foreign-key column's type differs from the target's primary key.
    #[error("foreign key '{type_name}.{column}' is {found} but '{target}' is keyed by {expected}")]
    IncompatibleForeignKey {
        type_name: String,
        column: String,
        target: String,
        expected: crate::ScalarType,
        found: crate::ScalarType,
    },
}

impl MappingError {
    pub(crate) fn misconfigured(type_name: &str, reason: impl Into<String>) -> Self {
        Self::MisconfiguredHierarchy {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn ambiguous(type_name: &str, member: &str, reason: impl Into<String>) -> Self {
        Self::AmbiguousMember {
            type_name: type_name.to_string(),
            member: member.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn duplicate(table: &str, column: &str) -> Self {
        Self::DuplicateColumnName {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Convenience alias for results with [`MappingError`].
pub type Result<T> = std::result::Result<T, MappingError>;
