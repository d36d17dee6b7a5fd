//! Merging classified members across hierarchy levels.
//!
//! Overrides are resolved as an explicit merge over ordered per-level member
//! sets rather than by dynamic dispatch:
//!
//! - [`merge_levels`] folds every level into one member list (one table for
//!   the whole hierarchy). A declaration replaces an earlier one of the same
//!   name when the earlier one comes from an ancestor; identical
//!   declarations on sibling branches collapse into one.
//! - [`split_levels`] keeps each level separate and reports only the members
//!   a level introduces or overrides (one table per level).
//!
//! [`link_foreign_keys`] and [`link_split_foreign_keys`] then pair reference
//! navigations with key columns declared on the same or an earlier level.

use std::collections::HashMap;

use crate::classify::{ClassifiedMember, MemberKind};
use crate::error::{MappingError, Result};
use crate::MappingConfig;

/// Classified members of one type in a hierarchy.
#[derive(Debug, Clone)]
pub struct HierarchyLevel {
    /// Type declaring the members.
    pub type_name: String,
    /// Table the level's columns land in (used for error reporting).
    pub table: String,
    /// Names of the level's ancestors within the hierarchy.
    pub ancestors: Vec<String>,
    /// Members declared on the type.
    pub members: Vec<ClassifiedMember>,
}

/// Folds all levels into a single member list, last-write-wins by member
/// name along ancestor chains.
///
/// Levels must be ordered so that every ancestor precedes its descendants
/// (walk order or pre-order). Members keep the position of their first
/// declaration.
///
/// # Errors
///
/// Returns [`MappingError::DuplicateColumnName`] when two sibling branches
/// declare the same member with a different shape.
pub fn merge_levels(levels: &[HierarchyLevel]) -> Result<Vec<ClassifiedMember>> {
    let mut merged: Vec<(String, ClassifiedMember)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for level in levels {
        for member in &level.members {
            match index.get(&member.member) {
                None => {
                    index.insert(member.member.clone(), merged.len());
                    merged.push((level.type_name.clone(), member.clone()));
                }
                Some(&i) => {
                    let (declared_by, existing) = &merged[i];
                    if level.ancestors.iter().any(|a| a == declared_by) {
                        merged[i] = (level.type_name.clone(), member.clone());
                    } else if !same_shape(&existing.kind, &member.kind) {
                        return Err(MappingError::duplicate(&level.table, &column_label(member)));
                    }
                }
            }
        }
    }

    Ok(merged.into_iter().map(|(_, member)| member).collect())
}

/// Splits a root-to-leaf chain into the members each level owns.
///
/// The first level owns all of its members. Later levels own members that
/// are new to the chain plus overrides of inherited members; an override
/// must keep the inherited shape. An identical redeclaration still counts
/// as an override, so the level gets its own table. Excluded members and
/// redeclared primary keys are never owned by a derived level.
///
/// # Errors
///
/// Returns [`MappingError::DuplicateColumnName`] when a level redeclares an
/// inherited member with an incompatible type or kind.
pub fn split_levels(levels: &[HierarchyLevel]) -> Result<Vec<Vec<ClassifiedMember>>> {
    let mut inherited: HashMap<&str, &MemberKind> = HashMap::new();
    let mut out = Vec::with_capacity(levels.len());

    for level in levels {
        let mut own = Vec::new();
        for member in &level.members {
            if member.is_excluded() {
                continue;
            }
            match inherited.get(member.member.as_str()) {
                None => own.push(member.clone()),
                Some(previous) => {
                    if !compatible_override(previous, &member.kind) {
                        return Err(MappingError::duplicate(&level.table, &column_label(member)));
                    }
                    if !matches!(member.kind, MemberKind::PrimaryKey(_)) {
                        own.push(member.clone());
                    }
                }
            }
        }
        for member in &level.members {
            inherited.insert(member.member.as_str(), &member.kind);
        }
        out.push(own);
    }

    Ok(out)
}

/// Points reference navigations at a `<member><suffix>` column found
/// anywhere in the merged member list.
///
/// Classification only sees one type at a time, so a navigation declared on
/// a derived type whose key column is inherited gets linked here.
pub fn link_foreign_keys(members: &mut [ClassifiedMember], config: &MappingConfig) {
    let columns: HashMap<String, String> = members
        .iter()
        .filter_map(|m| m.column().map(|c| (c.member.clone(), c.name.clone())))
        .collect();

    for member in members.iter_mut() {
        if let MemberKind::Reference(nav) = &mut member.kind {
            if nav.foreign_key.is_none() {
                nav.foreign_key = columns.get(&config.foreign_key_for(&nav.member)).cloned();
            }
        }
    }
}

/// Links reference navigations of each split level to a `<member><suffix>`
/// column owned by that level or any level before it.
///
/// The column may land in an ancestor table; every row of the derived type
/// still has it through the parent key.
pub fn link_split_foreign_keys(levels: &mut [Vec<ClassifiedMember>], config: &MappingConfig) {
    let mut columns: HashMap<String, String> = HashMap::new();

    for level in levels.iter_mut() {
        columns.extend(
            level
                .iter()
                .filter_map(|m| m.column().map(|c| (c.member.clone(), c.name.clone()))),
        );
        for member in level.iter_mut() {
            if let MemberKind::Reference(nav) = &mut member.kind {
                if nav.foreign_key.is_none() {
                    nav.foreign_key = columns.get(&config.foreign_key_for(&nav.member)).cloned();
                }
            }
        }
    }
}

fn same_shape(a: &MemberKind, b: &MemberKind) -> bool {
    match (a, b) {
        (MemberKind::Excluded, MemberKind::Excluded) => true,
        (MemberKind::PrimaryKey(x), MemberKind::PrimaryKey(y))
        | (MemberKind::Column(x), MemberKind::Column(y)) => x == y,
        (MemberKind::Reference(x), MemberKind::Reference(y))
        | (MemberKind::Collection(x), MemberKind::Collection(y)) => x.target == y.target,
        _ => false,
    }
}

fn compatible_override(previous: &MemberKind, next: &MemberKind) -> bool {
    match (previous, next) {
        (MemberKind::Excluded, _) | (_, MemberKind::Excluded) => true,
        (MemberKind::PrimaryKey(a), MemberKind::PrimaryKey(b))
        | (MemberKind::Column(a), MemberKind::Column(b)) => a.declared_type == b.declared_type,
        (MemberKind::Reference(a), MemberKind::Reference(b))
        | (MemberKind::Collection(a), MemberKind::Collection(b)) => a.target == b.target,
        _ => false,
    }
}

fn column_label(member: &ClassifiedMember) -> String {
    member
        .column()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| member.member.clone())
}
