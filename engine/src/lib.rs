//! SQL engine dialects for the tablemap metadata layer.
//!
//! - [`Dialect`]: the five supported databases and their fixed
//!   [`EngineOptions`] (escape pair, parameter prefix, indexed parameters).
//! - [`Engine`]: identifier escaping and parameter naming for one dialect,
//!   optionally bound to a [`TableBuilder`](tablemap_core::TableBuilder) so
//!   renderers can translate members into escaped column names.
//!
//! # Example
//!
//! ```
//! use tablemap_engine::{Dialect, Engine};
//!
//! let mysql = Engine::new(Dialect::MySql);
//! assert_eq!(mysql.escape_identifier("Name").unwrap(), "`Name`");
//! assert_eq!(mysql.format_parameter(0), "@p0");
//!
//! let oracle = Engine::new(Dialect::OracleDb);
//! assert_eq!(oracle.escape_identifier("Name").unwrap(), "\"Name\"");
//! assert_eq!(oracle.format_parameter(2), ":p2");
//! ```

mod dialect;
mod engine;
mod error;

pub use dialect::{Dialect, EngineOptions};
pub use engine::Engine;
pub use error::{EngineError, Result};
