//! Supported SQL dialects and their fixed engine options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Database engine whose SQL conventions the renderer targets.
///
/// # Examples
///
/// ```
/// use tablemap_engine::Dialect;
///
/// let dialect: Dialect = "postgres".parse().unwrap();
/// assert_eq!(dialect, Dialect::PostgreSql);
/// assert_eq!(dialect.to_string(), "PostgreSQL");
/// assert_eq!(dialect.options().parameter_prefix, "@p");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    PostgreSql,
    SqlServer,
    #[default]
    Sqlite,
    OracleDb,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Dialect; 5] = [
        Self::MySql,
        Self::PostgreSql,
        Self::SqlServer,
        Self::Sqlite,
        Self::OracleDb,
    ];

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::PostgreSql => "PostgreSQL",
            Self::SqlServer => "SQLServer",
            Self::Sqlite => "SQLite",
            Self::OracleDb => "OracleDB",
        }
    }

    /// Fixed options for this dialect.
    pub fn options(self) -> &'static EngineOptions {
        match self {
            Self::MySql => &MYSQL,
            Self::PostgreSql => &POSTGRESQL,
            Self::SqlServer => &SQLSERVER,
            Self::Sqlite => &SQLITE,
            Self::OracleDb => &ORACLEDB,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            "sqlserver" | "mssql" | "tsql" => Ok(Self::SqlServer),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "oracledb" | "oracle" => Ok(Self::OracleDb),
            _ => Err(EngineError::UnknownDialect(s.to_string())),
        }
    }
}

/// Identifier escaping and parameter naming rules of one dialect.
///
/// Values are built at compile time and never change; obtain them through
/// [`Dialect::options`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineOptions {
    pub dialect: Dialect,
    /// Character opening an escaped identifier.
    pub escape_start: char,
    /// Character closing an escaped identifier.
    pub escape_end: char,
    /// Prefix of positional parameter names.
    pub parameter_prefix: &'static str,
    /// Parameters are named by prefix plus zero-based ordinal.
    pub indexed_parameters: bool,
}

static MYSQL: EngineOptions = EngineOptions {
    dialect: Dialect::MySql,
    escape_start: '`',
    escape_end: '`',
    parameter_prefix: "@p",
    indexed_parameters: true,
};

static POSTGRESQL: EngineOptions = EngineOptions {
    dialect: Dialect::PostgreSql,
    escape_start: '"',
    escape_end: '"',
    parameter_prefix: "@p",
    indexed_parameters: true,
};

static SQLSERVER: EngineOptions = EngineOptions {
    dialect: Dialect::SqlServer,
    escape_start: '[',
    escape_end: ']',
    parameter_prefix: "@p",
    indexed_parameters: true,
};

static SQLITE: EngineOptions = EngineOptions {
    dialect: Dialect::Sqlite,
    escape_start: '"',
    escape_end: '"',
    parameter_prefix: "@p",
    indexed_parameters: true,
};

static ORACLEDB: EngineOptions = EngineOptions {
    dialect: Dialect::OracleDb,
    escape_start: '"',
    escape_end: '"',
    parameter_prefix: ":p",
    indexed_parameters: true,
};
