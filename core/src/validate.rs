//! Model and table validation.
//!
//! [`validate_bundle`] and [`validate_type`] check registered type
//! information before any resolution happens, catching empty or reserved
//! names, duplicate declarations, and dangling base links. [`validate_table`] checks
//! a built table for duplicate column names and the single-key rule.
//!
//! # Examples
//!
//! ```
//! use tablemap_core::*;
//!
//! let person = TypeInfo::new("Person")
//!     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32));
//! assert!(validate_type(&person).is_empty());
//!
//! // Invalid: the same member declared twice
//! let bad = TypeInfo::new("Person")
//!     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
//!     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int64));
//! assert!(!validate_type(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::error::MappingError;
use crate::{ModelBundle, ScalarType, TableDescriptor, TypeInfo};

/// Model/bundle validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Bundle version string is empty.
    #[error("model bundle version cannot be empty")]
    EmptyBundleVersion,
    /// Type name is empty or whitespace-only.
    #[error("type name cannot be empty")]
    EmptyTypeName,
    /// Two types in the same bundle share a name.
    #[error("duplicate type in bundle: {0}")]
    DuplicateType(String),
    /// Member name is empty or whitespace-only.
    #[error("type '{0}' declares a member with an empty name")]
    EmptyMemberName(String),
    /// Two members of one type share a name.
    #[error("type '{type_name}' declares member '{member}' more than once")]
    DuplicateMember { type_name: String, member: String },
    /// A base type is not part of the bundle.
    #[error("type '{type_name}' derives from unknown type '{base}'")]
    UnknownBase { type_name: String, base: String },
    /// A type names itself as its base.
    #[error("type '{0}' cannot derive from itself")]
    SelfBase(String),
    /// A type name collides with a member type keyword and could never be
    /// referenced by a member.
    #[error("type name '{0}' is reserved for a member type keyword")]
    ReservedTypeName(String),
}

/// Validates a full model bundle.
///
/// Checks for an empty version string, duplicate type names, base links that
/// leave the bundle, and validates each type individually. `allowed_bases`
/// lists names that may appear as a base without being declared (the
/// configured base marker, typically).
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let mut bundle = ModelBundle::new("1.0.0");
/// bundle.types.push(TypeInfo::new("Person").with_base("Entity"));
/// assert!(validate_bundle(&bundle, &["Entity"]).is_empty());
///
/// // Duplicate type → error
/// bundle.types.push(TypeInfo::new("Person"));
/// let errors = validate_bundle(&bundle, &["Entity"]);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateType(_))));
/// ```
pub fn validate_bundle(bundle: &ModelBundle, allowed_bases: &[&str]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if bundle.version.trim().is_empty() {
        errors.push(ValidationError::EmptyBundleVersion);
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for info in &bundle.types {
        if !seen.insert(info.name.as_str()) {
            errors.push(ValidationError::DuplicateType(info.name.clone()));
            return errors;
        }
        errors.extend(validate_type(info));
        if !errors.is_empty() {
            return errors;
        }
    }

    for info in &bundle.types {
        if let Some(base) = info.base.as_deref() {
            if !seen.contains(base) && !allowed_bases.contains(&base) {
                errors.push(ValidationError::UnknownBase {
                    type_name: info.name.clone(),
                    base: base.to_string(),
                });
                return errors;
            }
        }
    }

    errors
}

/// Validates one type's declaration.
pub fn validate_type(info: &TypeInfo) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if info.name.trim().is_empty() {
        errors.push(ValidationError::EmptyTypeName);
        return errors;
    }
    if info.name == "bytes" || ScalarType::from_keyword(&info.name).is_some() {
        errors.push(ValidationError::ReservedTypeName(info.name.clone()));
        return errors;
    }
    if info.base.as_deref() == Some(info.name.as_str()) {
        errors.push(ValidationError::SelfBase(info.name.clone()));
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for member in &info.members {
        let name = member.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyMemberName(info.name.clone()));
            return errors;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateMember {
                type_name: info.name.clone(),
                member: name.to_string(),
            });
            return errors;
        }
    }

    errors
}

/// Checks a built table: unique column names and exactly one primary key.
///
/// # Errors
///
/// - [`MappingError::DuplicateColumnName`] when two columns share a name.
/// - [`MappingError::AmbiguousPrimaryKey`] when the table has zero or several
///   key columns.
pub fn validate_table(table: &TableDescriptor) -> Result<(), MappingError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(MappingError::duplicate(&table.name, &column.name));
        }
    }

    let found = table.key_columns().count();
    if found != 1 {
        return Err(MappingError::AmbiguousPrimaryKey {
            table: table.name.clone(),
            found,
        });
    }

    Ok(())
}
