use std::sync::{Arc, Barrier};
use std::thread;

use tablemap_core::*;

fn address() -> TypeInfo {
    TypeInfo::new("Address")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Street", ScalarType::String))
}

fn department() -> TypeInfo {
    TypeInfo::new("Department")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Name", ScalarType::String))
        .with_member(MemberDescriptor::collection("Employees", "Employee"))
}

/// Flat person used by the No-Inheritance scenarios.
fn flat_model() -> TypeModel {
    let person = TypeInfo::new("Person")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Guid", ScalarType::Guid))
        .with_member(MemberDescriptor::scalar("Name", ScalarType::String))
        .with_member(MemberDescriptor::scalar("SurName", ScalarType::String))
        .with_member(MemberDescriptor::scalar("FullName", ScalarType::String).computed())
        .with_member(MemberDescriptor::reference("Address", "Address"))
        .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32).nullable())
        .with_member(MemberDescriptor::reference("Department", "Department"))
        .with_member(MemberDescriptor::bytes("Image"));
    let department = TypeInfo::new("Department")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Name", ScalarType::String))
        .with_member(MemberDescriptor::collection("People", "Person"));

    [person, department, address()].into_iter().collect()
}

/// Person/Employee hierarchy used by the inheritance scenarios.
fn hierarchy_model() -> TypeModel {
    let person = TypeInfo::new("Person")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Name", ScalarType::String))
        .with_member(MemberDescriptor::scalar("Surname", ScalarType::String))
        .with_member(MemberDescriptor::reference("Address", "Address"));
    let employee = TypeInfo::new("Employee")
        .with_base("Person")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Name", ScalarType::String))
        .with_member(MemberDescriptor::scalar("Salary", ScalarType::Decimal))
        .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32))
        .with_member(MemberDescriptor::reference("Department", "Department"))
        .with_member(MemberDescriptor::bytes("Image"));

    [person, employee, department(), address()].into_iter().collect()
}

fn columns(table: &TableDescriptor) -> Vec<&str> {
    table.column_names()
}

#[test]
fn test_no_inheritance_person_columns() {
    let builder = TableBuilder::new(flat_model(), MappingConfig::default());
    let table = builder.resolve_table("Person").unwrap();

    assert_eq!(table.name, "Person");
    assert_eq!(
        columns(&table),
        vec!["Id", "Guid", "Name", "SurName", "DepartmentId", "Image"]
    );
    assert_eq!(table.primary_key, vec!["Id"]);
    assert!(table.column("Id").unwrap().primary_key);
    assert!(!table.column("Guid").unwrap().primary_key);
    assert_eq!(table.column("Image").unwrap().declared_type, ScalarType::Binary);
    assert!(table.column("FullName").is_none());

    let navs: Vec<_> = table
        .navigations
        .iter()
        .map(|n| (n.member.as_str(), n.kind))
        .collect();
    assert_eq!(
        navs,
        vec![
            ("Address", NavigationKind::Reference),
            ("Department", NavigationKind::Reference)
        ]
    );
}

#[test]
fn test_no_inheritance_ignores_base_members() {
    let model: TypeModel = [
        TypeInfo::new("Person")
            .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
            .with_member(MemberDescriptor::scalar("Name", ScalarType::String)),
        TypeInfo::new("Employee")
            .with_base("Person")
            .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
            .with_member(MemberDescriptor::scalar("Salary", ScalarType::Decimal)),
    ]
    .into_iter()
    .collect();

    let builder = TableBuilder::new(model, MappingConfig::default());
    let table = builder.resolve_table("Employee").unwrap();
    assert_eq!(columns(&table), vec!["Id", "Salary"]);

    let err = builder.resolve_column("Employee", "Name").unwrap_err();
    assert!(matches!(err, MappingError::UnknownMember { .. }));
}

#[test]
fn test_table_per_hierarchy_union() {
    let builder = TableBuilder::new(
        hierarchy_model(),
        MappingConfig::new(Strategy::TablePerHierarchy),
    );
    let table = builder.resolve_table("Employee").unwrap();

    assert_eq!(table.name, "Person");
    assert_eq!(
        columns(&table),
        vec!["Id", "Name", "Surname", "Salary", "DepartmentId", "Image"]
    );
    assert_eq!(table.types, vec!["Person", "Employee"]);

    let person = builder.resolve_table("Person").unwrap();
    assert!(Arc::ptr_eq(&table, &person));
    assert_eq!(builder.resolve_hierarchy("Employee").unwrap().len(), 1);
}

#[test]
fn test_table_per_hierarchy_with_base_marker() {
    let mut model = hierarchy_model();
    model.register(TypeInfo::new("Entity").abstract_type());
    model.register(
        TypeInfo::new("Person")
            .with_base("Entity")
            .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
            .with_member(MemberDescriptor::scalar("Name", ScalarType::String)),
    );
    let address = address().with_base("Entity");
    let department = department().with_base("Entity");
    model.register(address);
    model.register(department);

    let builder = TableBuilder::new(
        model,
        MappingConfig::new(Strategy::TablePerHierarchy).with_base_marker("Entity"),
    );
    let table = builder.resolve_table("Employee").unwrap();
    assert_eq!(table.name, "Person");
    assert_eq!(table.owner, "Person");

    let mappings = builder.resolve_all().unwrap();
    let names: Vec<_> = mappings.iter().map(|m| m.type_name.as_str()).collect();
    assert_eq!(names, vec!["Address", "Department", "Employee", "Person"]);
}

#[test]
fn test_table_per_type_two_tables() {
    let builder = TableBuilder::new(hierarchy_model(), MappingConfig::new(Strategy::TablePerType));
    let tables = builder.resolve_hierarchy("Employee").unwrap();

    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].name, "Person");
    assert_eq!(columns(&tables[0]), vec!["Id", "Name", "Surname"]);
    assert!(tables[0].parent.is_none());

    assert_eq!(tables[1].name, "Employee");
    assert_eq!(
        columns(&tables[1]),
        vec!["Id", "Name", "Salary", "DepartmentId", "Image"]
    );
    let parent = tables[1].parent.as_ref().unwrap();
    assert_eq!(parent.table, "Person");
    assert_eq!(parent.key, vec!["Id"]);

    let person = builder.resolve("Person").unwrap();
    assert!(Arc::ptr_eq(&person.table, &tables[0]));
    assert_eq!(builder.resolve_column("Employee", "Surname").unwrap().name, "Surname");
    assert_eq!(
        builder.resolve_column("Employee", "Department").unwrap().name,
        "DepartmentId"
    );
}

#[test]
fn test_table_per_type_level_without_members_shares_parent_table() {
    let mut model = hierarchy_model();
    model.register(TypeInfo::new("Intern").with_base("Employee"));

    let builder = TableBuilder::new(model, MappingConfig::new(Strategy::TablePerType));
    let intern = builder.resolve("Intern").unwrap();
    assert_eq!(intern.table.name, "Employee");
    assert_eq!(intern.hierarchy.len(), 2);
}

#[test]
fn test_table_per_type_incompatible_override() {
    let mut model = hierarchy_model();
    model.register(
        TypeInfo::new("Contractor")
            .with_base("Person")
            .with_member(MemberDescriptor::scalar("Surname", ScalarType::Int32)),
    );

    let builder = TableBuilder::new(model, MappingConfig::new(Strategy::TablePerType));
    let err = builder.resolve("Contractor").unwrap_err();
    assert_eq!(
        err,
        MappingError::DuplicateColumnName {
            table: "Contractor".to_string(),
            column: "Surname".to_string()
        }
    );
    assert!(!builder.registry().contains("Contractor"));
}

#[test]
fn test_resolution_is_idempotent() {
    for strategy in [
        Strategy::NoInheritance,
        Strategy::TablePerHierarchy,
        Strategy::TablePerType,
    ] {
        let builder = TableBuilder::new(hierarchy_model(), MappingConfig::new(strategy));
        let first = builder.resolve_table("Person").unwrap();
        let second = builder.resolve_table("Person").unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
    }
}

#[test]
fn test_concurrent_first_access_runs_one_session() {
    let builder = Arc::new(TableBuilder::new(
        hierarchy_model(),
        MappingConfig::new(Strategy::TablePerType),
    ));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let builder = Arc::clone(&builder);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                builder.resolve_table("Employee").unwrap()
            })
        })
        .collect();

    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builder.registry().session_count(), 1);
    for table in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], table));
    }
}

#[test]
fn test_foreign_key_round_trip() {
    let builder = TableBuilder::new(flat_model(), MappingConfig::default());
    let column = builder.resolve_column("Person", "Department").unwrap();
    assert_eq!(column.name, "DepartmentId");
    assert!(column.nullable);

    let mut model = flat_model();
    let mut person = model.get("Person").unwrap().clone();
    person.members.retain(|m| m.name != "DepartmentId");
    model.register(person);

    let builder = TableBuilder::new(model, MappingConfig::default());
    let table = builder.resolve_table("Person").unwrap();
    assert!(table.navigation("Department").unwrap().foreign_key.is_none());

    let err = builder.resolve_column("Person", "Department").unwrap_err();
    assert_eq!(
        err,
        MappingError::MissingForeignKey {
            type_name: "Person".to_string(),
            member: "Department".to_string(),
            expected: "DepartmentId".to_string()
        }
    );
}

#[test]
fn test_resolve_column_rejects_non_columns() {
    let builder = TableBuilder::new(flat_model(), MappingConfig::default());

    let err = builder.resolve_column("Person", "FullName").unwrap_err();
    assert!(matches!(err, MappingError::NotAColumn { .. }));

    let err = builder.resolve_column("Department", "People").unwrap_err();
    assert!(matches!(err, MappingError::NotAColumn { .. }));

    let err = builder.resolve_column("Person", "Nickname").unwrap_err();
    assert!(matches!(err, MappingError::UnknownMember { .. }));
}

#[test]
fn test_department_employee_cycle() {
    for strategy in [
        Strategy::NoInheritance,
        Strategy::TablePerHierarchy,
        Strategy::TablePerType,
    ] {
        let builder = TableBuilder::new(hierarchy_model(), MappingConfig::new(strategy));
        let department = builder.resolve_table("Department").unwrap();
        let nav = department.navigation("Employees").unwrap();
        assert_eq!(nav.kind, NavigationKind::Collection);
        assert_eq!(nav.target, "Employee");

        let target = builder.navigation_target("Department", "Employees").unwrap();
        let owner = if strategy == Strategy::TablePerHierarchy {
            "Person"
        } else {
            "Employee"
        };
        assert_eq!(target.owner, owner);
        assert_eq!(builder.registry().session_count(), 1, "{strategy}");
    }
}

#[test]
fn test_unmapped_navigation_target() {
    let model: TypeModel = [TypeInfo::new("Order")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int64))
        .with_member(MemberDescriptor::reference("Customer", "Customer"))]
    .into_iter()
    .collect();

    let builder = TableBuilder::new(model, MappingConfig::default());
    assert_eq!(
        builder.resolve("Order").unwrap_err(),
        MappingError::UnmappedType("Customer".to_string())
    );
    assert!(builder.registry().is_empty());
}

#[test]
fn test_primary_key_must_be_unique() {
    let model: TypeModel = [TypeInfo::new("Log")
        .with_member(MemberDescriptor::scalar("Message", ScalarType::String))]
    .into_iter()
    .collect();
    let builder = TableBuilder::new(model, MappingConfig::default());
    assert_eq!(
        builder.resolve("Log").unwrap_err(),
        MappingError::AmbiguousPrimaryKey {
            table: "Log".to_string(),
            found: 0
        }
    );

    let model: TypeModel = [TypeInfo::new("Log")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("ID", ScalarType::Int64))]
    .into_iter()
    .collect();
    let builder = TableBuilder::new(model, MappingConfig::default());
    assert!(matches!(
        builder.resolve("Log").unwrap_err(),
        MappingError::AmbiguousPrimaryKey { found: 2, .. }
    ));
}

#[test]
fn test_column_override_collision() {
    let model: TypeModel = [TypeInfo::new("Account")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("Email", ScalarType::String))
        .with_member(MemberDescriptor::scalar("Login", ScalarType::String).with_column("Email"))]
    .into_iter()
    .collect();

    let builder = TableBuilder::new(model, MappingConfig::default());
    assert_eq!(
        builder.resolve("Account").unwrap_err(),
        MappingError::DuplicateColumnName {
            table: "Account".to_string(),
            column: "Email".to_string()
        }
    );
}

#[test]
fn test_model_loaded_from_yaml() {
    let yaml = r#"
version: "1.0.0"
name: shop
types:
  - name: Customer
    members:
      - { name: Id, type: guid }
      - { name: Name, type: string }
      - { name: Orders, type: "[Order]" }
  - name: Order
    table: Orders
    members:
      - { name: Id, type: int64 }
      - { name: CustomerId, type: guid }
      - { name: Customer, type: Customer }
      - { name: Receipt, type: bytes, nullable: true }
"#;
    let bundle: ModelBundle = serde_yaml::from_str(yaml).unwrap();
    assert!(validate_bundle(&bundle, &[]).is_empty());

    let builder = TableBuilder::new(bundle.into_model(), MappingConfig::default());
    let orders = builder.resolve_table("Order").unwrap();
    assert_eq!(orders.name, "Orders");
    assert_eq!(columns(&orders), vec!["Id", "CustomerId", "Receipt"]);

    let customer = builder.resolve_table("Customer").unwrap();
    let nav = customer.navigation("Orders").unwrap();
    assert_eq!(nav.inverse.as_deref(), Some("Customer"));
    assert_eq!(nav.foreign_key.as_deref(), Some("CustomerId"));
}

#[test]
fn test_inverse_left_unset_when_pairing_is_ambiguous() {
    let employee = TypeInfo::new("Employee")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32))
        .with_member(MemberDescriptor::reference("Department", "Department"))
        .with_member(MemberDescriptor::scalar("ManagedDepartmentId", ScalarType::Int32).nullable())
        .with_member(MemberDescriptor::reference("ManagedDepartment", "Department"));
    let model: TypeModel = [employee, department()].into_iter().collect();
    let builder = TableBuilder::new(model, MappingConfig::default());

    let table = builder.resolve_table("Employee").unwrap();
    for member in ["Department", "ManagedDepartment"] {
        let nav = table.navigation(member).unwrap();
        assert_eq!(nav.inverse, None, "{member}");
        assert!(nav.foreign_key.is_some());
    }

    let table = builder.resolve_table("Department").unwrap();
    let nav = table.navigation("Employees").unwrap();
    assert_eq!(nav.inverse, None);
    assert_eq!(nav.foreign_key, None);
}

/// Person declares the key column, Employee declares the navigation.
fn inherited_key_model(department_key: ScalarType) -> TypeModel {
    let person = TypeInfo::new("Person")
        .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
        .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32).nullable());
    let employee = TypeInfo::new("Employee")
        .with_base("Person")
        .with_member(MemberDescriptor::reference("Department", "Department"));
    let department = TypeInfo::new("Department")
        .with_member(MemberDescriptor::scalar("Id", department_key));

    [person, employee, department].into_iter().collect()
}

#[test]
fn test_inherited_foreign_key_links_in_every_hierarchy_strategy() {
    for strategy in [Strategy::TablePerHierarchy, Strategy::TablePerType] {
        let builder =
            TableBuilder::new(inherited_key_model(ScalarType::Int32), MappingConfig::new(strategy));
        let column = builder.resolve_column("Employee", "Department").unwrap();
        assert_eq!(column.name, "DepartmentId", "{strategy:?}");
        assert!(column.nullable);
    }

    let builder = TableBuilder::new(
        inherited_key_model(ScalarType::Int32),
        MappingConfig::new(Strategy::TablePerType),
    );
    let employee = builder.resolve_table("Employee").unwrap();
    assert!(employee.column("DepartmentId").is_none());
    assert_eq!(
        employee.navigation("Department").unwrap().foreign_key.as_deref(),
        Some("DepartmentId")
    );
}

#[test]
fn test_inherited_foreign_key_type_is_checked() {
    let builder = TableBuilder::new(
        inherited_key_model(ScalarType::Guid),
        MappingConfig::new(Strategy::TablePerType),
    );
    let err = builder.resolve("Employee").unwrap_err();
    assert!(matches!(
        err,
        MappingError::IncompatibleForeignKey { ref column, .. } if column == "DepartmentId"
    ));
}
