//! Member classification for a single type.
//!
//! [`classify`] looks at one [`TypeInfo`] in isolation and decides, for each
//! declared member, whether it is the primary key, a scalar column, a single
//! navigation, a collection navigation, or excluded. Rules apply in this
//! order:
//!
//! 1. ignored or computed members are excluded;
//! 2. byte arrays are binary columns (before the collection rule);
//! 3. arrays of a mapped type are collection navigations;
//! 4. references to a mapped type are single navigations, with the
//!    `<member><suffix>` sibling recorded as the foreign key;
//! 5. the primary-key convention on an identity-compatible scalar is the key;
//! 6. every other stored scalar is a plain column.

use std::collections::HashSet;

use crate::descriptor::{ColumnDescriptor, NavigationDescriptor, NavigationKind};
use crate::error::{MappingError, Result};
use crate::{MappingConfig, MemberDescriptor, MemberType, ScalarType, TypeInfo};

/// Classification outcome for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    PrimaryKey(ColumnDescriptor),
    Column(ColumnDescriptor),
    Reference(NavigationDescriptor),
    Collection(NavigationDescriptor),
    /// Computed, ignored, or otherwise without backing storage.
    Excluded,
}

/// A member together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMember {
    pub member: String,
    pub kind: MemberKind,
}

impl ClassifiedMember {
    /// The column this member persists, if any.
    pub fn column(&self) -> Option<&ColumnDescriptor> {
        match &self.kind {
            MemberKind::PrimaryKey(column) | MemberKind::Column(column) => Some(column),
            _ => None,
        }
    }

    /// The navigation this member declares, if any.
    pub fn navigation(&self) -> Option<&NavigationDescriptor> {
        match &self.kind {
            MemberKind::Reference(nav) | MemberKind::Collection(nav) => Some(nav),
            _ => None,
        }
    }

    /// Returns `true` for excluded members.
    pub fn is_excluded(&self) -> bool {
        matches!(self.kind, MemberKind::Excluded)
    }
}

/// Classifies every member declared on `info`.
///
/// `is_mapped` answers whether a type name is registered with the builder;
/// it separates navigations from unmapped references.
///
/// # Errors
///
/// - [`MappingError::UnmappedType`] for references or collections of an
///   unregistered type.
/// - [`MappingError::UnsupportedMember`] for arrays of anything other than
///   bytes or a mapped type.
/// - [`MappingError::AmbiguousMember`] when a member is declared twice, when
///   a navigation follows the primary-key naming convention, or when a
///   navigation's foreign-key sibling is not a stored scalar.
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let person = TypeInfo::new("Person")
///     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
///     .with_member(MemberDescriptor::scalar("FullName", ScalarType::String).computed())
///     .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32).nullable())
///     .with_member(MemberDescriptor::reference("Department", "Department"));
///
/// let members = classify(&person, &MappingConfig::default(), |name| name == "Department").unwrap();
/// assert!(matches!(members[0].kind, MemberKind::PrimaryKey(_)));
/// assert!(members[1].is_excluded());
/// let nav = members[3].navigation().unwrap();
/// assert_eq!(nav.foreign_key.as_deref(), Some("DepartmentId"));
/// ```
pub fn classify(
    info: &TypeInfo,
    config: &MappingConfig,
    is_mapped: impl Fn(&str) -> bool,
) -> Result<Vec<ClassifiedMember>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(info.members.len());

    for member in &info.members {
        if !seen.insert(member.name.as_str()) {
            return Err(MappingError::ambiguous(
                &info.name,
                &member.name,
                "declared more than once on the same type",
            ));
        }
        let kind = classify_member(info, member, config, &is_mapped)?;
        out.push(ClassifiedMember {
            member: member.name.clone(),
            kind,
        });
    }

    Ok(out)
}

fn classify_member(
    info: &TypeInfo,
    member: &MemberDescriptor,
    config: &MappingConfig,
    is_mapped: &impl Fn(&str) -> bool,
) -> Result<MemberKind> {
    if !member.has_storage() {
        return Ok(MemberKind::Excluded);
    }

    if member.member_type.is_byte_array() {
        return Ok(MemberKind::Column(column(member, ScalarType::Binary, false)));
    }

    match &member.member_type {
        MemberType::Array(_) => {
            let Some(element) = member.member_type.element_type_name() else {
                return Err(MappingError::UnsupportedMember {
                    type_name: info.name.clone(),
                    member: member.name.clone(),
                    member_type: member.member_type.to_string(),
                });
            };
            if !is_mapped(element) {
                return Err(MappingError::UnmappedType(element.to_string()));
            }
            Ok(MemberKind::Collection(NavigationDescriptor::new(
                NavigationKind::Collection,
                &member.name,
                element,
            )))
        }
        MemberType::Named(target) => {
            if !is_mapped(target) {
                return Err(MappingError::UnmappedType(target.clone()));
            }
            if config.is_primary_key_name(&member.name) {
                return Err(MappingError::ambiguous(
                    &info.name,
                    &member.name,
                    "navigation follows the primary-key naming convention",
                ));
            }
            let mut nav =
                NavigationDescriptor::new(NavigationKind::Reference, &member.name, target);
            nav.foreign_key = foreign_key_sibling(info, member, config)?;
            Ok(MemberKind::Reference(nav))
        }
        MemberType::Scalar(scalar) => {
            if config.is_primary_key_name(&member.name) && scalar.is_identity_compatible() {
                Ok(MemberKind::PrimaryKey(column(member, *scalar, true)))
            } else {
                Ok(MemberKind::Column(column(member, *scalar, false)))
            }
        }
    }
}

fn foreign_key_sibling(
    info: &TypeInfo,
    navigation: &MemberDescriptor,
    config: &MappingConfig,
) -> Result<Option<String>> {
    let expected = config.foreign_key_for(&navigation.name);
    let Some(sibling) = info.member(&expected).filter(|m| m.has_storage()) else {
        return Ok(None);
    };
    if sibling.member_type.as_scalar().is_none() {
        return Err(MappingError::ambiguous(
            &info.name,
            &sibling.name,
            format!("foreign key of '{}' is not a scalar", navigation.name),
        ));
    }
    Ok(Some(sibling.column_name().to_string()))
}

fn column(member: &MemberDescriptor, declared_type: ScalarType, primary_key: bool) -> ColumnDescriptor {
    ColumnDescriptor {
        member: member.name.clone(),
        name: member.column_name().to_string(),
        declared_type,
        nullable: member.nullable && !primary_key,
        primary_key,
    }
}
