use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tablemap_catalog::CatalogConfig;
use tablemap_core::{TableBuilder, TableMapping};
use tablemap_engine::{Dialect, Engine};
use tablemap_sqlite::{Migration, create_table_sql, dependency_order};

const DEFAULT_CONFIG: &str = "tablemap.yml";

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
    Text,
}

#[derive(Debug, Parser)]
#[command(name = "tablemap")]
#[command(about = "Inspect table mappings and manage SQLite schemas for a type model")]
struct Cli {
    /// Catalog configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve types to their table descriptors.
    Resolve(ResolveArgs),
    /// Print the escaped column persisting a member.
    Column(ColumnArgs),
    /// List supported SQL dialects and their conventions.
    Dialects(DialectsArgs),
    /// Print SQLite DDL for the tables serving the given types.
    Ddl(DdlArgs),
    /// Create, drop, or inspect mapped tables in a SQLite database.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Types to resolve.
    types: Vec<String>,
    /// Resolve every concrete type of the model in parallel.
    #[arg(long, conflicts_with = "types")]
    all: bool,
    /// Number of parallel resolution jobs with --all (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ColumnArgs {
    /// Type declaring or inheriting the member.
    type_name: String,
    /// Member name.
    member: String,
    /// Dialect overriding the configured one.
    #[arg(long)]
    dialect: Option<Dialect>,
}

#[derive(Debug, Args)]
struct DialectsArgs {
    /// Output format.
    #[arg(long, default_value = "text")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct DdlArgs {
    /// Types to generate tables for (default: every concrete type).
    types: Vec<String>,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create mapped tables in the database.
    Up(MigrateTargetArgs),
    /// Drop mapped tables from the database.
    Down(MigrateTargetArgs),
    /// Show which mapped tables exist and their row counts.
    Status(MigrateTargetArgs),
}

#[derive(Debug, Args)]
struct MigrateTargetArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Types whose tables are affected (default: every concrete type).
    types: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Resolve(args) => run_resolve(&cli.config, args),
        Command::Column(args) => run_column(&cli.config, args),
        Command::Dialects(args) => run_dialects(args),
        Command::Ddl(args) => run_ddl(&cli.config, args),
        Command::Migrate(args) => run_migrate(&cli.config, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_resolve(config_path: &Path, args: ResolveArgs) -> Result<(), String> {
    let (_, builder) = load_builder(config_path)?;

    let types = if args.all || args.types.is_empty() {
        concrete_types(&builder)
    } else {
        args.types
    };

    let mappings: Vec<Arc<TableMapping>> = if args.all {
        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = args.jobs {
            pool = pool.num_threads(jobs);
        }
        let pool = pool
            .build()
            .map_err(|e| format!("Failed to create thread pool: {e}"))?;
        pool.install(|| {
            types
                .par_iter()
                .map(|name| builder.resolve(name).map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, String>>()
        })?
    } else {
        types
            .iter()
            .map(|name| builder.resolve(name).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, String>>()?
    };

    let output = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&mappings)
            .map_err(|e| format!("Failed to serialize mappings: {e}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&mappings)
            .map_err(|e| format!("Failed to serialize mappings: {e}"))?,
        CliOutputFormat::Text => mappings.iter().map(|m| render_mapping(m)).collect(),
    };
    print!("{output}");
    if args.format == CliOutputFormat::Json {
        println!();
    }
    Ok(())
}

fn run_column(config_path: &Path, args: ColumnArgs) -> Result<(), String> {
    let (config, builder) = load_builder(config_path)?;
    let dialect = args.dialect.unwrap_or(config.dialect);
    let engine = Engine::new(dialect).with_builder(Arc::new(builder));

    let column = engine
        .escaped_column(&args.type_name, &args.member)
        .map_err(|e| e.to_string())?;
    println!("{column}");
    Ok(())
}

fn run_dialects(args: DialectsArgs) -> Result<(), String> {
    let options: Vec<_> = Dialect::ALL.iter().map(|d| d.options()).collect();
    match args.format {
        CliOutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&options)
                .map_err(|e| format!("Failed to serialize dialects: {e}"))?
        ),
        CliOutputFormat::Yaml => print!(
            "{}",
            serde_yaml::to_string(&options)
                .map_err(|e| format!("Failed to serialize dialects: {e}"))?
        ),
        CliOutputFormat::Text => {
            println!("{:<12} {:<8} {:<8} {}", "DIALECT", "ESCAPE", "PARAM", "INDEXED");
            for option in options {
                println!(
                    "{:<12} {:<8} {:<8} {}",
                    option.dialect.name(),
                    format!("{}{}", option.escape_start, option.escape_end),
                    format!("{}0", option.parameter_prefix),
                    if option.indexed_parameters { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}

fn run_ddl(config_path: &Path, args: DdlArgs) -> Result<(), String> {
    let (_, builder) = load_builder(config_path)?;
    let types = if args.types.is_empty() {
        concrete_types(&builder)
    } else {
        args.types
    };

    let engine = Engine::new(Dialect::Sqlite).with_builder(Arc::new(builder));
    let tables = dependency_order(&engine, &types).map_err(|e| e.to_string())?;
    for table in tables {
        print!(
            "{}",
            create_table_sql(&engine, &table).map_err(|e| e.to_string())?
        );
    }
    Ok(())
}

fn run_migrate(config_path: &Path, args: MigrateArgs) -> Result<(), String> {
    let (_, builder) = load_builder(config_path)?;

    match args.operation {
        MigrateOperation::Up(target) => {
            let (mut migration, types) = open_migration(builder, &target)?;
            let created = migration
                .up(&types)
                .map_err(|e| format!("Migration up failed: {e}"))?;
            println!(
                "Migration up complete. {} table(s) ensured in '{}': {}",
                created.len(),
                target.db.display(),
                created.join(", ")
            );
        }
        MigrateOperation::Down(target) => {
            let (mut migration, types) = open_migration(builder, &target)?;
            let dropped = migration
                .down(&types)
                .map_err(|e| format!("Migration down failed: {e}"))?;
            println!(
                "Migration down complete. {} table(s) dropped from '{}': {}",
                dropped.len(),
                target.db.display(),
                dropped.join(", ")
            );
        }
        MigrateOperation::Status(target) => {
            let (migration, types) = open_migration(builder, &target)?;
            let status = migration
                .status(&types)
                .map_err(|e| format!("Failed to get migration status: {e}"))?;
            println!("Migration Status:");
            for table in &status.tables {
                println!(
                    "  {:<24} {:<4} rows: {}",
                    table.name,
                    if table.exists { "yes" } else { "no" },
                    table.rows
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_builder(config_path: &Path) -> Result<(CatalogConfig, TableBuilder), String> {
    let config = CatalogConfig::load(config_path)
        .map_err(|e| format!("Failed to load config '{}': {e}", config_path.display()))?;
    let builder = config
        .table_builder()
        .map_err(|e| format!("Failed to load model: {e}"))?;
    Ok((config, builder))
}

fn open_migration(
    builder: TableBuilder,
    target: &MigrateTargetArgs,
) -> Result<(Migration, Vec<String>), String> {
    let types = if target.types.is_empty() {
        concrete_types(&builder)
    } else {
        target.types.clone()
    };
    let conn = rusqlite::Connection::open(&target.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", target.db.display()))?;
    let migration = Migration::new(conn, Arc::new(builder))
        .map_err(|e| format!("Failed to initialize migration: {e}"))?;
    Ok((migration, types))
}

/// Non-abstract model types other than the base marker, in name order.
fn concrete_types(builder: &TableBuilder) -> Vec<String> {
    let marker = builder.config().base_marker.as_deref();
    builder
        .model()
        .iter()
        .filter(|info| !info.is_abstract && Some(info.name.as_str()) != marker)
        .map(|info| info.name.clone())
        .collect()
}

fn render_mapping(mapping: &TableMapping) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", mapping.type_name, mapping.strategy);
    for table in &mapping.hierarchy {
        let _ = write!(out, "  table {}", table.name);
        if let Some(parent) = &table.parent {
            let _ = write!(out, " -> {}", parent.table);
        }
        out.push('\n');
        for column in &table.columns {
            let mut flags = Vec::new();
            if column.primary_key {
                flags.push("pk");
            }
            if column.nullable {
                flags.push("null");
            }
            let _ = writeln!(
                out,
                "    {:<20} {:<10} {}",
                column.name,
                column.declared_type.keyword(),
                flags.join(" ")
            );
        }
        for navigation in &table.navigations {
            let _ = writeln!(
                out,
                "    {:<20} -> {}{}",
                navigation.member,
                navigation.target,
                navigation
                    .foreign_key
                    .as_deref()
                    .map(|fk| format!(" via {fk}"))
                    .unwrap_or_default()
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use tablemap_core::*;

    use super::*;

    fn builder() -> TableBuilder {
        let model: TypeModel = [
            TypeInfo::new("Entity").abstract_type(),
            TypeInfo::new("Shape")
                .abstract_type()
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32)),
            TypeInfo::new("Circle")
                .with_base("Shape")
                .with_member(MemberDescriptor::scalar("Radius", ScalarType::Double)),
            TypeInfo::new("Tag").with_base("Base"),
        ]
        .into_iter()
        .collect();
        TableBuilder::new(model, MappingConfig::default().with_base_marker("Base"))
    }

    #[test]
    fn test_concrete_types_skip_abstract() {
        assert_eq!(concrete_types(&builder()), vec!["Circle", "Tag"]);
    }

    #[test]
    fn test_render_mapping_lists_tables_and_columns() {
        let builder = TableBuilder::new(
            builder().model().clone(),
            MappingConfig::new(Strategy::TablePerHierarchy),
        );
        let mapping = builder.resolve("Circle").unwrap();
        let text = render_mapping(&mapping);

        assert!(text.starts_with("Circle (table_per_hierarchy)\n"));
        assert!(text.contains("  table Shape\n"));
        assert!(text.contains("Id"));
        assert!(text.contains("pk"));
        assert!(text.contains("Radius"));
    }
}
