use std::path::Path;
use std::sync::Arc;

use tablemap_catalog::{CatalogConfig, CatalogError, ModelCatalog};
use tablemap_core::*;
use tablemap_engine::Dialect;
use tempfile::TempDir;

const PEOPLE: &str = r#"
version: "2.1.0"
name: people
types:
  - name: Person
    base: Entity
    members:
      - { name: Id, type: int32 }
      - { name: Name, type: string }
  - name: Employee
    base: Person
    members:
      - { name: Salary, type: decimal }
      - { name: DepartmentId, type: int32, nullable: true }
      - { name: Department, type: Department, nullable: true }
"#;

const DEPARTMENT: &str = r#"{
  "name": "Department",
  "base": "Entity",
  "members": [
    { "name": "Id", "type": "int32" },
    { "name": "Employees", "type": "[Employee]" }
  ]
}"#;

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "people.yaml", PEOPLE);
    write(dir.path(), "model/department.json", DEPARTMENT);
    write(
        dir.path(),
        "tablemap.yml",
        "version: \"1.0\"\ndialect: sqlserver\nmapping:\n  strategy: table_per_type\n  base_marker: Entity\nmodels:\n  - people.yaml\n  - model\n",
    );
    dir
}

#[test]
fn test_bundle_loads_name_and_types() {
    let dir = workspace();
    let catalog = ModelCatalog::from_bundle(dir.path().join("people.yaml")).unwrap();

    assert_eq!(catalog.name(), Some("people"));
    assert_eq!(catalog.type_names(), vec!["Employee", "Person"]);
    let employee = catalog.get("Employee").unwrap();
    assert_eq!(employee.base.as_deref(), Some("Person"));
    assert!(employee.member("Department").unwrap().nullable);
}

#[test]
fn test_config_merges_sources_and_builds_tables() {
    let dir = workspace();
    let config = CatalogConfig::load(dir.path().join("tablemap.yml")).unwrap();
    assert_eq!(config.dialect, Dialect::SqlServer);

    let builder = Arc::new(config.table_builder().unwrap());
    assert_eq!(builder.model().len(), 3);

    let hierarchy = builder.resolve_hierarchy("Employee").unwrap();
    let names: Vec<_> = hierarchy.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Person", "Employee"]);

    let engine = config.engine(builder);
    assert_eq!(
        engine.escaped_column("Employee", "Department").unwrap(),
        "[Employee].[DepartmentId]"
    );
}

#[test]
fn test_unknown_base_rejected_without_marker() {
    let dir = workspace();
    let mut config = CatalogConfig::load(dir.path().join("tablemap.yml")).unwrap();
    config.mapping.base_marker = None;

    let err = config.load_model().unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidModel(ValidationError::UnknownBase { ref base, .. }) if base == "Entity"
    ));
}

#[test]
fn test_duplicate_across_sources() {
    let dir = workspace();
    write(
        dir.path(),
        "model/person.yml",
        "name: Person\nmembers:\n  - { name: Id, type: int32 }\n",
    );
    let config = CatalogConfig::load(dir.path().join("tablemap.yml")).unwrap();

    let err = config.load_model().unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateType { ref name, .. } if name == "Person"));
}

#[test]
fn test_invalid_declaration_rejected() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "broken.yaml",
        "version: \"1\"\ntypes:\n  - name: Person\n    members:\n      - { name: Id, type: int32 }\n      - { name: Id, type: int64 }\n",
    );

    let err = ModelCatalog::from_bundle(dir.path().join("broken.yaml")).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidModel(ValidationError::DuplicateMember { .. })
    ));
}

#[test]
fn test_malformed_member_type_is_yaml_error() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "bad.yaml",
        "version: \"1\"\ntypes:\n  - name: Person\n    members:\n      - { name: Tags, type: \"[string\" }\n",
    );

    let err = ModelCatalog::from_bundle(dir.path().join("bad.yaml")).unwrap_err();
    assert!(matches!(err, CatalogError::YamlError(_)));
}

#[test]
fn test_config_save_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut config = CatalogConfig::new("1.0").with_model("model");
    config.dialect = Dialect::OracleDb;
    config.mapping = MappingConfig::new(Strategy::TablePerHierarchy).with_base_marker("Entity");

    let path = dir.path().join("saved.yml");
    config.save(&path).unwrap();
    let loaded = CatalogConfig::load(&path).unwrap();

    assert_eq!(loaded.dialect, Dialect::OracleDb);
    assert_eq!(loaded.mapping, config.mapping);
    assert_eq!(loaded.model_paths(), vec![dir.path().join("model")]);
}
