use std::sync::Arc;

use tablemap_core::{ColumnDescriptor, MappingError, TableBuilder, TableDescriptor};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::{Dialect, EngineOptions};

/// Dialect-aware identifier and parameter formatting, optionally bound to a
/// [`TableBuilder`] for metadata lookups.
///
/// # Examples
///
/// ```
/// use tablemap_engine::{Dialect, Engine};
///
/// let engine = Engine::new(Dialect::SqlServer);
/// assert_eq!(engine.escape_identifier("Name").unwrap(), "[Name]");
/// assert_eq!(engine.escape_path(["dbo", "Person"]).unwrap(), "[dbo].[Person]");
/// assert_eq!(engine.format_parameter(1), "@p1");
/// assert!(engine.escape_identifier("Weird]Name").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    options: &'static EngineOptions,
    builder: Option<Arc<TableBuilder>>,
}

impl Engine {
    /// Creates an engine without a bound builder.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            options: dialect.options(),
            builder: None,
        }
    }

    /// Binds a table builder for metadata lookups.
    pub fn with_builder(mut self, builder: Arc<TableBuilder>) -> Self {
        debug!(dialect = %self.options.dialect, strategy = %builder.strategy(), "binding table builder");
        self.builder = Some(builder);
        self
    }

    pub fn options(&self) -> &'static EngineOptions {
        self.options
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    pub fn builder(&self) -> Option<&Arc<TableBuilder>> {
        self.builder.as_ref()
    }

    /// Wraps `name` in the dialect's escape pair.
    ///
    /// Embedded delimiters are never doubled; an identifier containing the
    /// escape-end character is rejected instead.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedIdentifier`] for empty identifiers
    /// and identifiers containing the escape-end character.
    pub fn escape_identifier(&self, name: &str) -> Result<String> {
        if name.is_empty() || name.contains(self.options.escape_end) {
            return Err(EngineError::UnsupportedIdentifier {
                identifier: name.to_string(),
                dialect: self.options.dialect,
            });
        }
        let mut escaped = String::with_capacity(name.len() + 2);
        escaped.push(self.options.escape_start);
        escaped.push_str(name);
        escaped.push(self.options.escape_end);
        Ok(escaped)
    }

    /// Escapes each part and joins them with `.`.
    pub fn escape_path<'a>(&self, parts: impl IntoIterator<Item = &'a str>) -> Result<String> {
        let escaped = parts
            .into_iter()
            .map(|part| self.escape_identifier(part))
            .collect::<Result<Vec<_>>>()?;
        Ok(escaped.join("."))
    }

    /// Name of the positional parameter at `ordinal` (zero-based).
    ///
    /// Every supported dialect addresses parameters by index, so the name is
    /// the prefix followed by the ordinal.
    pub fn format_parameter(&self, ordinal: usize) -> String {
        format!("{}{ordinal}", self.options.parameter_prefix)
    }

    /// Table holding the type's most derived columns.
    pub fn resolve_table(&self, type_name: &str) -> Result<Arc<TableDescriptor>> {
        Ok(self.bound()?.resolve_table(type_name)?)
    }

    /// Column persisting `member`, following navigations to their
    /// foreign-key column.
    pub fn resolve_column(&self, type_name: &str, member: &str) -> Result<ColumnDescriptor> {
        Ok(self.bound()?.resolve_column(type_name, member)?)
    }

    /// Escaped table name of `type_name`.
    pub fn escaped_table(&self, type_name: &str) -> Result<String> {
        let table = self.resolve_table(type_name)?;
        self.escape_identifier(&table.name)
    }

    /// Escaped `table.column` for `member`, naming the table that actually
    /// holds the column.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use tablemap_core::*;
    /// use tablemap_engine::{Dialect, Engine};
    ///
    /// let model: TypeModel = [
    ///     TypeInfo::new("Department")
    ///         .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32)),
    ///     TypeInfo::new("Person")
    ///         .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
    ///         .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32))
    ///         .with_member(MemberDescriptor::reference("Department", "Department")),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let builder = Arc::new(TableBuilder::new(model, MappingConfig::default()));
    /// let engine = Engine::new(Dialect::MySql).with_builder(builder);
    /// assert_eq!(
    ///     engine.escaped_column("Person", "Department").unwrap(),
    ///     "`Person`.`DepartmentId`"
    /// );
    /// ```
    pub fn escaped_column(&self, type_name: &str, member: &str) -> Result<String> {
        let builder = self.bound()?;
        let column = builder.resolve_column(type_name, member)?;
        let hierarchy = builder.resolve_hierarchy(type_name)?;
        let table = hierarchy
            .iter()
            .rev()
            .find(|table| table.column(&column.name) == Some(&column))
            .ok_or_else(|| MappingError::UnknownMember {
                type_name: type_name.to_string(),
                member: member.to_string(),
            })?;
        self.escape_path([table.name.as_str(), column.name.as_str()])
    }

    fn bound(&self) -> Result<&TableBuilder> {
        self.builder
            .as_deref()
            .ok_or(EngineError::NoBuilder(self.options.dialect))
    }
}
