//! Table metadata for object-relational mapping.
//!
//! This crate turns a registered object model into engine-agnostic table
//! descriptors:
//!
//! - [`TypeModel`] / [`TypeInfo`] / [`MemberDescriptor`]: the registered
//!   types, their base links, and the members they declare.
//! - [`MappingConfig`]: naming conventions (primary key, foreign-key
//!   suffix, base marker) and the inheritance [`Strategy`].
//! - [`walk`] and [`descendants`]: hierarchy traversal.
//! - [`classify`]: per-member decisions (key, column, navigation, excluded).
//! - [`TableBuilder`]: resolves types into [`TableDescriptor`]s under
//!   No-Inheritance, Table-Per-Hierarchy, or Table-Per-Type, caching them in
//!   a [`TableRegistry`].
//!
//! Validation ([`validate_bundle`], [`validate_type`], [`validate_table`])
//! catches malformed declarations and tables before they reach an engine.
//!
//! # Example
//!
//! ```
//! use tablemap_core::*;
//!
//! let model: TypeModel = [
//!     TypeInfo::new("Person")
//!         .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
//!         .with_member(MemberDescriptor::scalar("Name", ScalarType::String)),
//!     TypeInfo::new("Employee")
//!         .with_base("Person")
//!         .with_member(MemberDescriptor::scalar("Salary", ScalarType::Decimal)),
//!     TypeInfo::new("Customer")
//!         .with_base("Person")
//!         .with_member(MemberDescriptor::scalar("Discount", ScalarType::Double)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let builder = TableBuilder::new(model, MappingConfig::new(Strategy::TablePerHierarchy));
//! let table = builder.resolve_table("Employee").unwrap();
//!
//! assert_eq!(table.name, "Person");
//! assert_eq!(table.column_names(), vec!["Id", "Name", "Discount", "Salary"]);
//! assert_eq!(builder.resolve_column("Employee", "Salary").unwrap().name, "Salary");
//! ```

mod builder;
mod classify;
mod config;
mod descriptor;
mod error;
mod merge;
mod package;
mod registry;
mod types;
mod validate;
mod walker;

pub use builder::TableBuilder;
pub use classify::{ClassifiedMember, MemberKind, classify};
pub use config::*;
pub use descriptor::*;
pub use error::{MappingError, Result};
pub use merge::{
    HierarchyLevel, link_foreign_keys, link_split_foreign_keys, merge_levels, split_levels,
};
pub use package::ModelBundle;
pub use registry::TableRegistry;
pub use types::*;
pub use validate::{ValidationError, validate_bundle, validate_table, validate_type};
pub use walker::{descendants, walk};
