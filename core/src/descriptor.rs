//! Resolved table metadata.
//!
//! Descriptors are the engine-agnostic output of the table builder. They are
//! owned by the [`TableRegistry`](crate::TableRegistry) and shared as
//! `Arc`s; navigation targets are stored as type names and looked up through
//! the registry on demand, so reference cycles in the object model never
//! become ownership cycles here.

use std::sync::Arc;

use serde::Serialize;

use crate::{ScalarType, Strategy};

/// One persisted column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Member the column stores.
    pub member: String,
    /// Column name (defaults to the member name).
    pub name: String,
    /// Declared value type.
    pub declared_type: ScalarType,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
}

/// Shape of a navigation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// Singular reference to another mapped type.
    Reference,
    /// List of another mapped type; the inverse of some reference.
    Collection,
}

/// Relationship from a member to another mapped type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationDescriptor {
    pub kind: NavigationKind,
    /// Member declaring the navigation.
    pub member: String,
    /// Target (or element) type name, resolved lazily through the registry.
    pub target: String,
    /// Column persisting the reference, when a foreign-key sibling exists.
    /// For collections this is the foreign-key column on the target table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// Member on the target type pointing back at this one, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
}

impl NavigationDescriptor {
    pub(crate) fn new(kind: NavigationKind, member: &str, target: &str) -> Self {
        Self {
            kind,
            member: member.to_string(),
            target: target.to_string(),
            foreign_key: None,
            inverse: None,
        }
    }
}

/// Implicit one-to-one link from a Table-Per-Type table to its parent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentLink {
    /// Parent table name.
    pub table: String,
    /// Type owning the parent table.
    pub owner: String,
    /// Shared primary-key column names.
    pub key: Vec<String>,
}

/// Resolved metadata for one mapped table.
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let model: TypeModel = [TypeInfo::new("Tag")
///     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
///     .with_member(MemberDescriptor::scalar("Label", ScalarType::String))]
/// .into_iter()
/// .collect();
///
/// let builder = TableBuilder::new(model, MappingConfig::default());
/// let table = builder.resolve_table("Tag").unwrap();
/// assert_eq!(table.name, "Tag");
/// assert_eq!(table.primary_key, vec!["Id"]);
/// assert_eq!(table.column_names(), vec!["Id", "Label"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Type whose mapping produced the table.
    pub owner: String,
    /// Columns in declaration order (walk order for merged hierarchies).
    pub columns: Vec<ColumnDescriptor>,
    /// Primary-key column names.
    pub primary_key: Vec<String>,
    /// Navigation members mapped onto this table.
    pub navigations: Vec<NavigationDescriptor>,
    /// Parent table under Table-Per-Type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
    /// Every type whose rows live (at least partly) in this table.
    pub types: Vec<String>,
}

impl TableDescriptor {
    /// Finds a column by column name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Finds the column storing `member`.
    pub fn column_for_member(&self, member: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.member == member)
    }

    /// Finds a navigation by member name.
    pub fn navigation(&self, member: &str) -> Option<&NavigationDescriptor> {
        self.navigations.iter().find(|n| n.member == member)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary-key columns.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

/// Registry entry for one resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMapping {
    /// The resolved type.
    pub type_name: String,
    /// Strategy used for the resolution.
    pub strategy: Strategy,
    /// Table holding the type's own (most derived) columns.
    pub table: Arc<TableDescriptor>,
    /// Tables serving the type, root first. A single entry unless the
    /// strategy is Table-Per-Type.
    pub hierarchy: Vec<Arc<TableDescriptor>>,
}
