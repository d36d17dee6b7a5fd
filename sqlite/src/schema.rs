//! SQL generation for resolved table descriptors.
//!
//! Generates `CREATE TABLE`, `DROP TABLE`, and `INSERT` statements for the
//! tables a [`TableBuilder`](tablemap_core::TableBuilder) resolves, with every
//! identifier escaped and every parameter named through an SQLite [`Engine`].
//!
//! # Column types
//!
//! | Scalar type | SQLite type |
//! |---|---|
//! | `bool`, `byte`, `int16`, `int32`, `int64` | `INTEGER` |
//! | `decimal` | `NUMERIC` |
//! | `double` | `REAL` |
//! | `string`, `guid`, `date_time` | `TEXT` |
//! | `binary` | `BLOB` |
//!
//! # Constraints
//!
//! - The primary key becomes a table-level `PRIMARY KEY` constraint.
//! - A Table-Per-Type child table references its parent table's key with
//!   `ON DELETE CASCADE`.
//! - A reference navigation whose foreign-key column lives in the same table
//!   references the target table's key. A key column inherited from an
//!   ancestor table gets no constraint.

use std::collections::HashSet;
use std::sync::Arc;

use tablemap_core::{NavigationKind, ScalarType, TableBuilder, TableDescriptor};
use tablemap_engine::{Engine, EngineError};

use crate::error::Result;

/// SQLite column type for a scalar type.
///
/// # Examples
///
/// ```
/// use tablemap_core::ScalarType;
/// use tablemap_sqlite::sqlite_type;
///
/// assert_eq!(sqlite_type(ScalarType::Int32), "INTEGER");
/// assert_eq!(sqlite_type(ScalarType::Binary), "BLOB");
/// ```
pub fn sqlite_type(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::Bool
        | ScalarType::Byte
        | ScalarType::Int16
        | ScalarType::Int32
        | ScalarType::Int64 => "INTEGER",
        ScalarType::Decimal => "NUMERIC",
        ScalarType::Double => "REAL",
        ScalarType::String | ScalarType::Guid | ScalarType::DateTime => "TEXT",
        ScalarType::Binary => "BLOB",
    }
}

/// Generates `CREATE TABLE IF NOT EXISTS` for `table`.
///
/// `engine` must be bound to the builder that produced `table`; foreign-key
/// targets are resolved through it.
///
/// # Errors
///
/// Returns [`SqliteError::EngineError`] if an identifier cannot be escaped
/// or a referenced table cannot be resolved.
pub fn create_table_sql(engine: &Engine, table: &TableDescriptor) -> Result<String> {
    let owner = bound_builder(engine)?.model().get(&table.owner);

    let mut lines = Vec::with_capacity(table.columns.len() + 2);
    for column in &table.columns {
        // Columns of derived types stay nullable in a shared table.
        let declared_by_owner = owner.is_some_and(|info| info.member(&column.member).is_some());
        let not_null = column.primary_key || (!column.nullable && declared_by_owner);
        lines.push(format!(
            "    {} {}{}",
            engine.escape_identifier(&column.name)?,
            sqlite_type(column.declared_type),
            if not_null { " NOT NULL" } else { "" }
        ));
    }

    lines.push(format!("    PRIMARY KEY ({})", column_list(engine, &table.primary_key)?));

    if let Some(parent) = &table.parent {
        lines.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE CASCADE",
            column_list(engine, &table.primary_key)?,
            engine.escape_identifier(&parent.table)?,
            column_list(engine, &parent.key)?
        ));
    }

    for navigation in &table.navigations {
        let (NavigationKind::Reference, Some(foreign_key)) = (navigation.kind, &navigation.foreign_key)
        else {
            continue;
        };
        // Key column inherited from an ancestor table.
        if table.column(foreign_key).is_none() {
            continue;
        }
        let target = engine.resolve_table(&navigation.target)?;
        lines.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({})",
            engine.escape_identifier(foreign_key)?,
            engine.escape_identifier(&target.name)?,
            column_list(engine, &target.primary_key)?
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
        engine.escape_identifier(&table.name)?,
        lines.join(",\n")
    ))
}

/// Generates `DROP TABLE IF EXISTS` for `table`.
pub fn drop_table_sql(engine: &Engine, table: &TableDescriptor) -> Result<String> {
    Ok(format!(
        "DROP TABLE IF EXISTS {};\n",
        engine.escape_identifier(&table.name)?
    ))
}

/// Generates an `INSERT` covering every column of `table`, with one
/// positional parameter per column in column order.
///
/// # Examples
///
/// ```
/// use tablemap_core::{ColumnDescriptor, ScalarType, TableDescriptor};
/// use tablemap_engine::{Dialect, Engine};
/// use tablemap_sqlite::insert_sql;
///
/// let table = TableDescriptor {
///     name: "Person".into(),
///     owner: "Person".into(),
///     columns: vec![
///         ColumnDescriptor {
///             member: "Id".into(),
///             name: "Id".into(),
///             declared_type: ScalarType::Int32,
///             nullable: false,
///             primary_key: true,
///         },
///         ColumnDescriptor {
///             member: "Name".into(),
///             name: "Name".into(),
///             declared_type: ScalarType::String,
///             nullable: true,
///             primary_key: false,
///         },
///     ],
///     primary_key: vec!["Id".into()],
///     navigations: Vec::new(),
///     parent: None,
///     types: vec!["Person".into()],
/// };
///
/// let sql = insert_sql(&Engine::new(Dialect::Sqlite), &table).unwrap();
/// assert_eq!(sql, r#"INSERT INTO "Person" ("Id", "Name") VALUES (@p0, @p1)"#);
/// ```
pub fn insert_sql(engine: &Engine, table: &TableDescriptor) -> Result<String> {
    let columns = table
        .columns
        .iter()
        .map(|column| engine.escape_identifier(&column.name))
        .collect::<tablemap_engine::Result<Vec<_>>>()?;
    let params: Vec<String> = (0..columns.len())
        .map(|ordinal| engine.format_parameter(ordinal))
        .collect();
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        engine.escape_identifier(&table.name)?,
        columns.join(", "),
        params.join(", ")
    ))
}

/// Distinct tables serving `types`, each listed after the tables it
/// references. Reference cycles are broken at the first revisit.
pub fn dependency_order<S: AsRef<str>>(
    engine: &Engine,
    types: &[S],
) -> Result<Vec<Arc<TableDescriptor>>> {
    let mut ordered = Vec::new();
    let mut visited = HashSet::new();
    for type_name in types {
        for table in hierarchy(engine, type_name.as_ref())? {
            visit(engine, table, &mut visited, &mut ordered)?;
        }
    }
    Ok(ordered)
}

fn visit(
    engine: &Engine,
    table: Arc<TableDescriptor>,
    visited: &mut HashSet<String>,
    ordered: &mut Vec<Arc<TableDescriptor>>,
) -> Result<()> {
    if !visited.insert(table.name.clone()) {
        return Ok(());
    }

    if let Some(parent) = &table.parent {
        visit(engine, engine.resolve_table(&parent.owner)?, visited, ordered)?;
    }
    for navigation in &table.navigations {
        if navigation.kind == NavigationKind::Reference && navigation.foreign_key.is_some() {
            visit(engine, engine.resolve_table(&navigation.target)?, visited, ordered)?;
        }
    }

    ordered.push(table);
    Ok(())
}

fn hierarchy(engine: &Engine, type_name: &str) -> Result<Vec<Arc<TableDescriptor>>> {
    Ok(bound_builder(engine)?.resolve_hierarchy(type_name)?)
}

fn column_list(engine: &Engine, names: &[String]) -> Result<String> {
    let escaped = names
        .iter()
        .map(|name| engine.escape_identifier(name))
        .collect::<tablemap_engine::Result<Vec<_>>>()?;
    Ok(escaped.join(", "))
}

fn bound_builder(engine: &Engine) -> Result<&TableBuilder> {
    engine
        .builder()
        .map(Arc::as_ref)
        .ok_or_else(|| EngineError::NoBuilder(engine.dialect()).into())
}

#[cfg(test)]
mod tests {
    use tablemap_core::*;
    use tablemap_engine::Dialect;

    use super::*;
    use crate::SqliteError;

    fn engine(strategy: Strategy) -> Engine {
        let model: TypeModel = [
            TypeInfo::new("Department")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("Title", ScalarType::String))
                .with_member(MemberDescriptor::collection("Employees", "Employee")),
            TypeInfo::new("Person")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("Name", ScalarType::String)),
            TypeInfo::new("Employee")
                .with_base("Person")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("Salary", ScalarType::Decimal))
                .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32).nullable())
                .with_member(MemberDescriptor::reference("Department", "Department")),
        ]
        .into_iter()
        .collect();
        let builder = TableBuilder::new(model, MappingConfig::new(strategy));
        Engine::new(Dialect::Sqlite).with_builder(Arc::new(builder))
    }

    #[test]
    fn test_sqlite_types() {
        assert_eq!(sqlite_type(ScalarType::Bool), "INTEGER");
        assert_eq!(sqlite_type(ScalarType::Decimal), "NUMERIC");
        assert_eq!(sqlite_type(ScalarType::Double), "REAL");
        assert_eq!(sqlite_type(ScalarType::Guid), "TEXT");
        assert_eq!(sqlite_type(ScalarType::DateTime), "TEXT");
    }

    #[test]
    fn test_create_table_per_type_child() {
        let engine = engine(Strategy::TablePerType);
        let table = engine.resolve_table("Employee").unwrap();
        let sql = create_table_sql(&engine, &table).unwrap();

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"Employee\" ("));
        assert!(sql.contains("\"Id\" INTEGER NOT NULL"));
        assert!(sql.contains("\"Salary\" NUMERIC NOT NULL"));
        assert!(sql.contains("\"DepartmentId\" INTEGER,"));
        assert!(sql.contains("PRIMARY KEY (\"Id\")"));
        assert!(sql.contains(
            "FOREIGN KEY (\"Id\") REFERENCES \"Person\"(\"Id\") ON DELETE CASCADE"
        ));
        assert!(sql.contains(
            "FOREIGN KEY (\"DepartmentId\") REFERENCES \"Department\"(\"Id\")"
        ));
    }

    #[test]
    fn test_inherited_foreign_key_gets_no_constraint() {
        let model: TypeModel = [
            TypeInfo::new("Department").with_member(MemberDescriptor::scalar("Id", ScalarType::Int32)),
            TypeInfo::new("Person")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32).nullable()),
            TypeInfo::new("Employee")
                .with_base("Person")
                .with_member(MemberDescriptor::reference("Department", "Department")),
        ]
        .into_iter()
        .collect();
        let builder = TableBuilder::new(model, MappingConfig::new(Strategy::TablePerType));
        let engine = Engine::new(Dialect::Sqlite).with_builder(Arc::new(builder));

        let table = engine.resolve_table("Employee").unwrap();
        let sql = create_table_sql(&engine, &table).unwrap();
        assert!(!sql.contains("DepartmentId"));
        assert!(sql.contains("REFERENCES \"Person\"(\"Id\") ON DELETE CASCADE"));
    }

    #[test]
    fn test_hierarchy_table_relaxes_derived_columns() {
        let engine = engine(Strategy::TablePerHierarchy);
        let table = engine.resolve_table("Person").unwrap();
        let sql = create_table_sql(&engine, &table).unwrap();

        assert!(sql.contains("\"Name\" TEXT NOT NULL"));
        assert!(sql.contains("\"Salary\" NUMERIC,"));
    }

    #[test]
    fn test_dependency_order_puts_targets_first() {
        let engine = engine(Strategy::TablePerType);
        let order = dependency_order(&engine, &["Employee", "Person"]).unwrap();
        let names: Vec<_> = order.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Person", "Department", "Employee"]);
    }

    #[test]
    fn test_drop_and_insert_sql() {
        let engine = engine(Strategy::NoInheritance);
        let table = engine.resolve_table("Department").unwrap();
        assert_eq!(
            drop_table_sql(&engine, &table).unwrap(),
            "DROP TABLE IF EXISTS \"Department\";\n"
        );
        assert_eq!(
            insert_sql(&engine, &table).unwrap(),
            "INSERT INTO \"Department\" (\"Id\", \"Title\") VALUES (@p0, @p1)"
        );
    }

    #[test]
    fn test_unbound_engine_is_rejected() {
        let engine = Engine::new(Dialect::Sqlite);
        let table = TableDescriptor {
            name: "Person".into(),
            owner: "Person".into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            navigations: Vec::new(),
            parent: None,
            types: Vec::new(),
        };
        assert!(matches!(
            create_table_sql(&engine, &table),
            Err(SqliteError::EngineError(_))
        ));
    }
}
