//! Mapping configuration accepted by the table builder.
//!
//! # Example YAML
//!
//! ```yaml
//! strategy: table_per_hierarchy
//! base_marker: Entity
//! primary_key: Id
//! foreign_key_suffix: Id
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default primary-key member name.
pub const DEFAULT_PRIMARY_KEY: &str = "Id";

/// Default suffix linking a navigation to its foreign-key sibling.
pub const DEFAULT_FOREIGN_KEY_SUFFIX: &str = "Id";

/// Inheritance-mapping strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Every class maps to its own table; hierarchies are not merged.
    #[default]
    NoInheritance,
    /// One table stores the whole hierarchy.
    TablePerHierarchy,
    /// Each level that introduces members owns a table linked by primary key.
    TablePerType,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoInheritance => "no_inheritance",
            Self::TablePerHierarchy => "table_per_hierarchy",
            Self::TablePerType => "table_per_type",
        })
    }
}

/// Naming conventions and strategy for a [`TableBuilder`](crate::TableBuilder).
///
/// # Examples
///
/// ```
/// use tablemap_core::{MappingConfig, Strategy};
///
/// let config = MappingConfig::default();
/// assert_eq!(config.primary_key, "Id");
/// assert_eq!(config.strategy, Strategy::NoInheritance);
///
/// let tph = MappingConfig::new(Strategy::TablePerHierarchy).with_base_marker("Entity");
/// assert_eq!(tph.base_marker.as_deref(), Some("Entity"));
/// assert_eq!(tph.foreign_key_for("Department"), "DepartmentId");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Type at which hierarchy walks stop (exclusive). `None` walks to a
    /// type without a base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_marker: Option<String>,
    /// Primary-key member name, compared ASCII case-insensitively.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Suffix appended to a navigation member name to find its FK sibling.
    #[serde(default = "default_foreign_key_suffix")]
    pub foreign_key_suffix: String,
    /// Inheritance-mapping strategy.
    #[serde(default)]
    pub strategy: Strategy,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_foreign_key_suffix() -> String {
    DEFAULT_FOREIGN_KEY_SUFFIX.to_string()
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            base_marker: None,
            primary_key: default_primary_key(),
            foreign_key_suffix: default_foreign_key_suffix(),
            strategy: Strategy::default(),
        }
    }
}

impl MappingConfig {
    /// Default conventions with the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Sets the base marker type.
    pub fn with_base_marker(mut self, marker: &str) -> Self {
        self.base_marker = Some(marker.to_string());
        self
    }

    /// Sets the primary-key member name.
    pub fn with_primary_key(mut self, name: &str) -> Self {
        self.primary_key = name.to_string();
        self
    }

    /// Sets the foreign-key suffix.
    pub fn with_foreign_key_suffix(mut self, suffix: &str) -> Self {
        self.foreign_key_suffix = suffix.to_string();
        self
    }

    /// Returns `true` if `member` follows the primary-key convention.
    pub fn is_primary_key_name(&self, member: &str) -> bool {
        member.eq_ignore_ascii_case(&self.primary_key)
    }

    /// Foreign-key sibling name for a navigation member.
    pub fn foreign_key_for(&self, navigation: &str) -> String {
        format!("{navigation}{}", self.foreign_key_suffix)
    }
}
