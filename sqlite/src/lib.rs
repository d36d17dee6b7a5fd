//! SQLite backend for tablemap descriptors.
//!
//! This crate turns resolved [`TableDescriptor`](tablemap_core::TableDescriptor)s
//! into SQLite DDL and manages their lifecycle over a `rusqlite` connection.
//!
//! # Architecture
//!
//! - **`schema`**: `CREATE TABLE` / `DROP TABLE` / `INSERT` generation with
//!   identifiers and parameters produced by the SQLite engine dialect
//! - **`migration`**: lifecycle operations (up/down/status) in dependency
//!   order
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use rusqlite::Connection;
//! use tablemap_core::*;
//! use tablemap_sqlite::Migration;
//!
//! let model: TypeModel = [TypeInfo::new("Tag")
//!     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int64))
//!     .with_member(MemberDescriptor::scalar("Label", ScalarType::String))]
//! .into_iter()
//! .collect();
//! let builder = Arc::new(TableBuilder::new(model, MappingConfig::default()));
//!
//! let mut migration = Migration::new(Connection::open_in_memory().unwrap(), builder).unwrap();
//! let created = migration.up(&["Tag"]).unwrap();
//! assert_eq!(created, vec!["Tag"]);
//! ```

mod error;
mod migration;
mod schema;

pub use error::{Result, SqliteError};
pub use migration::{Migration, MigrationStatus, TableStatus};
pub use schema::{create_table_sql, dependency_order, drop_table_sql, insert_sql, sqlite_type};
