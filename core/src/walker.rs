//! Type hierarchy walking.
//!
//! [`walk`] orders the chain of registered types from the configured base
//! (exclusive) down to a leaf. [`descendants`] lists every transitive
//! subtype of a root, which Table-Per-Hierarchy needs to build one table for
//! the whole hierarchy.

use std::collections::HashSet;

use crate::error::{MappingError, Result};
use crate::{TypeInfo, TypeModel};

/// Returns the chain of types from the top of the hierarchy to `leaf`.
///
/// The walk follows `base` links upward and stops before `base_marker`.
/// Without a marker it stops at the first type that has no base.
///
/// # Errors
///
/// - [`MappingError::UnmappedType`] if `leaf` or a base type is not registered.
/// - [`MappingError::MisconfiguredHierarchy`] if `leaf` is the marker itself,
///   if a marker is configured but the chain ends without reaching it, or if
///   the base chain loops.
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let model: TypeModel = [
///     TypeInfo::new("Entity"),
///     TypeInfo::new("Person").with_base("Entity"),
///     TypeInfo::new("Employee").with_base("Person"),
/// ]
/// .into_iter()
/// .collect();
///
/// let chain = walk(&model, "Employee", Some("Entity")).unwrap();
/// let names: Vec<_> = chain.iter().map(|t| t.name.as_str()).collect();
/// assert_eq!(names, vec!["Person", "Employee"]);
///
/// let chain = walk(&model, "Employee", None).unwrap();
/// assert_eq!(chain.len(), 3);
/// ```
pub fn walk<'a>(
    model: &'a TypeModel,
    leaf: &str,
    base_marker: Option<&str>,
) -> Result<Vec<&'a TypeInfo>> {
    if base_marker == Some(leaf) {
        return Err(MappingError::misconfigured(
            leaf,
            "the base marker itself cannot be mapped",
        ));
    }

    let mut chain = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut current = model
        .get(leaf)
        .ok_or_else(|| MappingError::UnmappedType(leaf.to_string()))?;

    loop {
        if !seen.insert(current.name.as_str()) {
            return Err(MappingError::misconfigured(
                leaf,
                format!("base chain loops at '{}'", current.name),
            ));
        }
        chain.push(current);

        match current.base.as_deref() {
            Some(base) if Some(base) == base_marker => break,
            Some(base) => {
                current = model
                    .get(base)
                    .ok_or_else(|| MappingError::UnmappedType(base.to_string()))?;
            }
            None => {
                if let Some(marker) = base_marker {
                    return Err(MappingError::misconfigured(
                        leaf,
                        format!(
                            "'{}' has no base but the walk never reached '{marker}'",
                            current.name
                        ),
                    ));
                }
                break;
            }
        }
    }

    chain.reverse();
    Ok(chain)
}

/// Returns every transitive subtype of `root` in pre-order, excluding
/// `root` itself. Siblings are visited in name order.
pub fn descendants<'a>(model: &'a TypeModel, root: &str) -> Vec<&'a TypeInfo> {
    let mut out = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    if let Some(info) = model.get(root) {
        seen.insert(info.name.as_str());
    }
    collect_descendants(model, root, &mut seen, &mut out);
    out
}

fn collect_descendants<'a>(
    model: &'a TypeModel,
    name: &str,
    seen: &mut HashSet<&'a str>,
    out: &mut Vec<&'a TypeInfo>,
) {
    for child in model.derived_types(name) {
        if seen.insert(child.name.as_str()) {
            out.push(child);
            collect_descendants(model, &child.name, seen, out);
        }
    }
}
