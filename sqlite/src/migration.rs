//! Migration lifecycle operations for mapped tables.
//!
//! Provides [`Migration`] for creating and dropping the tables a
//! [`TableBuilder`] resolves for a set of types. All mutation operations use
//! transactions to ensure atomicity.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rusqlite::Connection;
//! use tablemap_core::{MappingConfig, TableBuilder, TypeModel};
//! use tablemap_sqlite::Migration;
//!
//! let builder = Arc::new(TableBuilder::new(TypeModel::new(), MappingConfig::default()));
//! let conn = Connection::open("app.db").unwrap();
//! let mut migration = Migration::new(conn, builder).unwrap();
//!
//! migration.up(&["Employee"]).unwrap();
//! let status = migration.status(&["Employee"]).unwrap();
//! assert!(status.all_exist());
//! migration.down(&["Employee"]).unwrap();
//! ```

use std::sync::Arc;

use rusqlite::Connection;
use tablemap_core::TableBuilder;
use tablemap_engine::{Dialect, Engine};
use tracing::{debug, info};

use crate::error::{Result, SqliteError};
use crate::schema::{create_table_sql, dependency_order, drop_table_sql};

/// Manages the lifecycle of mapped tables in one SQLite database.
///
/// Tables are created in dependency order ([`up`](Self::up)) and dropped in
/// reverse ([`down`](Self::down)); [`status`](Self::status) reports which
/// exist and how many rows they hold.
pub struct Migration {
    conn: Connection,
    engine: Engine,
}

impl Migration {
    /// Creates a migration manager over `conn`, resolving tables through
    /// `builder`. Enables foreign-key enforcement on the connection.
    pub fn new(conn: Connection, builder: Arc<TableBuilder>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            engine: Engine::new(Dialect::Sqlite).with_builder(builder),
        })
    }

    /// Creates every table serving `types`, plus the tables they reference.
    ///
    /// Uses `CREATE TABLE IF NOT EXISTS` so it is safe to call multiple
    /// times. Returns the table names in creation order.
    pub fn up<S: AsRef<str>>(&mut self, types: &[S]) -> Result<Vec<String>> {
        let tables = dependency_order(&self.engine, types)?;
        let mut sql = String::new();
        for table in &tables {
            sql.push_str(&create_table_sql(&self.engine, table)?);
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to create tables: {e}")))?;
        tx.commit()?;

        info!(tables = tables.len(), "created tables");
        Ok(tables.iter().map(|t| t.name.clone()).collect())
    }

    /// Drops every table [`up`](Self::up) would create, in reverse order.
    ///
    /// Uses `DROP TABLE IF EXISTS` so it is safe to call even if tables do
    /// not exist. Returns the table names in drop order.
    pub fn down<S: AsRef<str>>(&mut self, types: &[S]) -> Result<Vec<String>> {
        let tables = dependency_order(&self.engine, types)?;
        let mut sql = String::new();
        for table in tables.iter().rev() {
            sql.push_str(&drop_table_sql(&self.engine, table)?);
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;

        info!(tables = tables.len(), "dropped tables");
        Ok(tables.iter().rev().map(|t| t.name.clone()).collect())
    }

    /// Reports, for every table [`up`](Self::up) would create, whether it
    /// exists and its row count.
    pub fn status<S: AsRef<str>>(&self, types: &[S]) -> Result<MigrationStatus> {
        let mut tables = Vec::new();
        for table in dependency_order(&self.engine, types)? {
            let exists = self.table_exists(&table.name)?;
            let rows = if exists { self.count_rows(&table.name)? } else { 0 };
            debug!(table = %table.name, exists, rows, "table status");
            tables.push(TableStatus {
                name: table.name.clone(),
                exists,
                rows,
            });
        }
        Ok(MigrationStatus { tables })
    }

    /// Engine used for escaping and parameter names.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
        let count: i64 = stmt.query_row([name], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn count_rows(&self, name: &str) -> Result<usize> {
        let table = self.engine.escape_identifier(name)?;
        let mut stmt = self.conn.prepare(&format!("SELECT COUNT(*) FROM {table}"))?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Status of one mapped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub name: String,
    pub exists: bool,
    /// Row count; zero when the table does not exist.
    pub rows: usize,
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    /// Tables in creation order.
    pub tables: Vec<TableStatus>,
}

impl MigrationStatus {
    /// Returns `true` when every table exists.
    pub fn all_exist(&self) -> bool {
        self.tables.iter().all(|t| t.exists)
    }

    /// Returns `true` when no table exists.
    pub fn none_exist(&self) -> bool {
        !self.tables.iter().any(|t| t.exists)
    }
}
