//! Table resolution for registered types.
//!
//! [`TableBuilder`] turns a [`TypeModel`] plus a [`MappingConfig`] into
//! [`TableMapping`]s. Types are resolved in groups: a single type under
//! No-Inheritance, the whole hierarchy under Table-Per-Hierarchy, and the
//! root-to-leaf chain under Table-Per-Type. Navigation targets are resolved
//! in the same session, with in-progress types answering through
//! placeholders so cyclic object graphs terminate.

use std::sync::Arc;

use tracing::debug;

use crate::classify::{classify, ClassifiedMember, MemberKind};
use crate::descriptor::{ColumnDescriptor, NavigationKind, ParentLink, TableDescriptor, TableMapping};
use crate::error::{MappingError, Result};
use crate::merge::{
    link_foreign_keys, link_split_foreign_keys, merge_levels, split_levels, HierarchyLevel,
};
use crate::registry::{PendingMapping, Placeholder, Session, TableRegistry};
use crate::validate::validate_table;
use crate::walker::{descendants, walk};
use crate::{MappingConfig, MemberDescriptor, MemberType, Strategy, TypeInfo, TypeModel};

/// Resolves mapped types into table descriptors and caches them.
///
/// A builder is `Send + Sync`; share it behind an `Arc` and resolve from any
/// thread. Each type is resolved at most once per registry.
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let model: TypeModel = [
///     TypeInfo::new("Person")
///         .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
///         .with_member(MemberDescriptor::scalar("Name", ScalarType::String)),
///     TypeInfo::new("Employee")
///         .with_base("Person")
///         .with_member(MemberDescriptor::scalar("Salary", ScalarType::Decimal)),
/// ]
/// .into_iter()
/// .collect();
///
/// let builder = TableBuilder::new(model, MappingConfig::new(Strategy::TablePerType));
/// let tables = builder.resolve_hierarchy("Employee").unwrap();
/// assert_eq!(tables.len(), 2);
/// assert_eq!(tables[1].column_names(), vec!["Id", "Salary"]);
/// assert_eq!(tables[1].parent.as_ref().unwrap().table, "Person");
/// ```
#[derive(Debug)]
pub struct TableBuilder {
    model: Arc<TypeModel>,
    config: MappingConfig,
    registry: TableRegistry,
}

impl TableBuilder {
    /// Creates a builder with an empty registry.
    pub fn new(model: impl Into<Arc<TypeModel>>, config: MappingConfig) -> Self {
        Self::with_registry(model, config, TableRegistry::new())
    }

    /// Creates a builder around an existing registry.
    pub fn with_registry(
        model: impl Into<Arc<TypeModel>>,
        config: MappingConfig,
        registry: TableRegistry,
    ) -> Self {
        Self {
            model: model.into(),
            config,
            registry,
        }
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Resolves `type_name`, returning the cached mapping when present.
    ///
    /// # Errors
    ///
    /// Any [`MappingError`] raised while resolving the type or a type it
    /// navigates to. Nothing from a failed resolution is cached.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<TableMapping>> {
        if let Some(hit) = self.registry.get(type_name) {
            return Ok(hit);
        }
        self.registry.run_session(type_name, |session| {
            debug!(type_name, strategy = %self.config.strategy, "starting resolution session");
            self.resolve_group(session, type_name)
        })
    }

    /// Table holding the type's most derived columns.
    pub fn resolve_table(&self, type_name: &str) -> Result<Arc<TableDescriptor>> {
        Ok(Arc::clone(&self.resolve(type_name)?.table))
    }

    /// Tables serving the type, root first.
    pub fn resolve_hierarchy(&self, type_name: &str) -> Result<Vec<Arc<TableDescriptor>>> {
        Ok(self.resolve(type_name)?.hierarchy.clone())
    }

    /// Resolves every concrete registered type.
    pub fn resolve_all(&self) -> Result<Vec<Arc<TableMapping>>> {
        self.model
            .iter()
            .filter(|info| !info.is_abstract && !self.is_marker(&info.name))
            .map(|info| self.resolve(&info.name))
            .collect()
    }

    /// Column persisting `member` on `type_name`.
    ///
    /// Scalar members report their own column and single navigations report
    /// their foreign-key column. Under Table-Per-Type the search runs from
    /// the leaf table up to the root.
    ///
    /// # Errors
    ///
    /// - [`MappingError::UnknownMember`] if neither the type nor an ancestor
    ///   declares the member.
    /// - [`MappingError::NotAColumn`] for excluded members and collections.
    /// - [`MappingError::MissingForeignKey`] for a single navigation without
    ///   a foreign-key sibling.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablemap_core::*;
    ///
    /// let model: TypeModel = [
    ///     TypeInfo::new("Department")
    ///         .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32)),
    ///     TypeInfo::new("Person")
    ///         .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
    ///         .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32).nullable())
    ///         .with_member(MemberDescriptor::reference("Department", "Department")),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let builder = TableBuilder::new(model, MappingConfig::default());
    /// assert_eq!(builder.resolve_column("Person", "Department").unwrap().name, "DepartmentId");
    /// ```
    pub fn resolve_column(&self, type_name: &str, member: &str) -> Result<ColumnDescriptor> {
        let mapping = self.resolve(type_name)?;
        let declaration = self.declaration(type_name, member)?;

        if !declaration.has_storage() {
            return Err(not_a_column(type_name, member, "member has no backing storage"));
        }

        for table in mapping.hierarchy.iter().rev() {
            if let Some(column) = table.column_for_member(member) {
                return Ok(column.clone());
            }
            if let Some(nav) = table.navigation(member) {
                return match nav.kind {
                    NavigationKind::Collection => {
                        Err(not_a_column(type_name, member, "collections have no column"))
                    }
                    NavigationKind::Reference => nav
                        .foreign_key
                        .as_deref()
                        .and_then(|fk| mapping.hierarchy.iter().rev().find_map(|t| t.column(fk)))
                        .cloned()
                        .ok_or_else(|| MappingError::MissingForeignKey {
                            type_name: type_name.to_string(),
                            member: member.to_string(),
                            expected: self.config.foreign_key_for(member),
                        }),
                };
            }
        }

        Err(MappingError::UnknownMember {
            type_name: type_name.to_string(),
            member: member.to_string(),
        })
    }

    /// Table of the type a navigation member points at.
    pub fn navigation_target(&self, type_name: &str, member: &str) -> Result<Arc<TableDescriptor>> {
        let mapping = self.resolve(type_name)?;
        self.declaration(type_name, member)?;

        let target = mapping
            .hierarchy
            .iter()
            .rev()
            .find_map(|table| table.navigation(member))
            .map(|nav| nav.target.clone())
            .ok_or_else(|| MappingError::UnknownMember {
                type_name: type_name.to_string(),
                member: member.to_string(),
            })?;
        self.resolve_table(&target)
    }

    fn resolve_group(&self, session: &mut Session<'_>, type_name: &str) -> Result<()> {
        match self.config.strategy {
            Strategy::NoInheritance => self.resolve_single(session, type_name),
            Strategy::TablePerHierarchy => self.resolve_merged(session, type_name),
            Strategy::TablePerType => self.resolve_split(session, type_name),
        }
    }

    fn resolve_single(&self, session: &mut Session<'_>, type_name: &str) -> Result<()> {
        let info = self.type_info(type_name)?;
        let members = self.classify_level(info)?;
        let table = build_table(info.table_name(), &info.name, members, vec![info.name.clone()]);
        validate_table(&table)?;

        debug!(type_name, table = %table.name, "resolving single table");
        session.enter(type_name, placeholder(&table))?;
        self.check_navigations(session, &table, &[])?;
        session.complete(table);
        session.add_mapping(PendingMapping {
            type_name: type_name.to_string(),
            strategy: Strategy::NoInheritance,
            owner: type_name.to_string(),
            lineage: vec![type_name.to_string()],
        });
        Ok(())
    }

    fn resolve_merged(&self, session: &mut Session<'_>, type_name: &str) -> Result<()> {
        let chain = self.chain(type_name)?;
        let root = chain[0];
        let mut hierarchy = vec![root];
        hierarchy.extend(descendants(&self.model, &root.name));

        let mut levels = Vec::with_capacity(hierarchy.len());
        for info in &hierarchy {
            let ancestors = self
                .chain(&info.name)?
                .into_iter()
                .filter(|a| a.name != info.name)
                .map(|a| a.name.clone())
                .collect();
            levels.push(HierarchyLevel {
                type_name: info.name.clone(),
                table: root.table_name().to_string(),
                ancestors,
                members: self.classify_level(info)?,
            });
        }

        let mut merged = merge_levels(&levels)?;
        link_foreign_keys(&mut merged, &self.config);

        let types: Vec<String> = hierarchy.iter().map(|t| t.name.clone()).collect();
        let table = build_table(root.table_name(), &root.name, merged, types.clone());
        validate_table(&table)?;

        debug!(type_name, table = %table.name, types = types.len(), "resolving merged hierarchy");
        for name in &types {
            session.enter(name, placeholder(&table))?;
        }
        self.check_navigations(session, &table, &[])?;
        session.complete(table);
        for name in types {
            session.add_mapping(PendingMapping {
                type_name: name,
                strategy: Strategy::TablePerHierarchy,
                owner: root.name.clone(),
                lineage: vec![root.name.clone()],
            });
        }
        Ok(())
    }

    fn resolve_split(&self, session: &mut Session<'_>, type_name: &str) -> Result<()> {
        let chain = self.chain(type_name)?;

        let mut levels = Vec::with_capacity(chain.len());
        for (i, info) in chain.iter().enumerate() {
            levels.push(HierarchyLevel {
                type_name: info.name.clone(),
                table: info.table_name().to_string(),
                ancestors: chain[..i].iter().map(|a| a.name.clone()).collect(),
                members: self.classify_level(info)?,
            });
        }
        let mut owned = split_levels(&levels)?;
        link_split_foreign_keys(&mut owned, &self.config);

        let root = chain[0];
        let key: Vec<ColumnDescriptor> = owned[0]
            .iter()
            .filter(|m| matches!(m.kind, MemberKind::PrimaryKey(_)))
            .filter_map(|m| m.column().cloned())
            .collect();
        if key.len() != 1 {
            return Err(MappingError::AmbiguousPrimaryKey {
                table: root.table_name().to_string(),
                found: key.len(),
            });
        }
        let key_names: Vec<String> = key.iter().map(|c| c.name.clone()).collect();

        let mut parent: Option<ParentLink> = None;
        let mut lineage: Vec<String> = Vec::new();
        let mut built = Vec::new();

        for (i, info) in chain.iter().enumerate() {
            if let Some(known) = session.lookup(&info.name) {
                if known.owner == info.name {
                    lineage.push(known.owner.clone());
                }
                parent = Some(ParentLink {
                    table: known.table,
                    owner: known.owner,
                    key: key_names.clone(),
                });
                continue;
            }

            if i == 0 || !owned[i].is_empty() {
                let mut members: Vec<ClassifiedMember> = Vec::new();
                if i > 0 {
                    members.extend(key.iter().map(|column| ClassifiedMember {
                        member: column.member.clone(),
                        kind: MemberKind::PrimaryKey(column.clone()),
                    }));
                }
                members.extend(owned[i].iter().cloned());

                let mut types = vec![info.name.clone()];
                types.extend(descendants(&self.model, &info.name).into_iter().map(|t| t.name.clone()));

                let mut table = build_table(info.table_name(), &info.name, members, types);
                table.parent = parent.take();
                validate_table(&table)?;

                debug!(type_name = %info.name, table = %table.name, "resolving type table");
                session.enter(&info.name, placeholder(&table))?;
                parent = Some(ParentLink {
                    table: table.name.clone(),
                    owner: info.name.clone(),
                    key: key_names.clone(),
                });
                lineage.push(info.name.clone());
                let inherited: Vec<ColumnDescriptor> = owned[..i]
                    .iter()
                    .flatten()
                    .filter_map(|m| m.column().cloned())
                    .collect();
                built.push((table, inherited));
            } else {
                let Some(link) = parent.as_ref() else {
                    return Err(MappingError::misconfigured(&info.name, "no ancestor table to inherit"));
                };
                debug!(type_name = %info.name, table = %link.table, "type introduces no members");
                session.enter(
                    &info.name,
                    Placeholder {
                        table: link.table.clone(),
                        owner: link.owner.clone(),
                        key: key.clone(),
                    },
                )?;
            }

            let owner = lineage
                .last()
                .cloned()
                .unwrap_or_else(|| info.name.clone());
            session.add_mapping(PendingMapping {
                type_name: info.name.clone(),
                strategy: Strategy::TablePerType,
                owner,
                lineage: lineage.clone(),
            });
        }

        for (table, inherited) in built {
            self.check_navigations(session, &table, &inherited)?;
            session.complete(table);
        }
        Ok(())
    }

    /// Resolves (or finds a placeholder for) every navigation target and
    /// checks that foreign keys match the target key type. `inherited` holds
    /// the columns of ancestor tables.
    fn check_navigations(
        &self,
        session: &mut Session<'_>,
        table: &TableDescriptor,
        inherited: &[ColumnDescriptor],
    ) -> Result<()> {
        for nav in &table.navigations {
            let target = self.target_of(session, &nav.target)?;
            if nav.kind != NavigationKind::Reference {
                continue;
            }
            let (Some(column), [target_key]) = (
                nav.foreign_key.as_deref().and_then(|fk| {
                    table.column(fk).or_else(|| inherited.iter().find(|c| c.name == fk))
                }),
                target.key.as_slice(),
            ) else {
                continue;
            };
            if column.declared_type != target_key.declared_type {
                return Err(MappingError::IncompatibleForeignKey {
                    type_name: table.owner.clone(),
                    column: column.name.clone(),
                    target: nav.target.clone(),
                    expected: target_key.declared_type,
                    found: column.declared_type,
                });
            }
        }
        Ok(())
    }

    fn target_of(&self, session: &mut Session<'_>, target: &str) -> Result<Placeholder> {
        if let Some(known) = session.lookup(target) {
            return Ok(known);
        }
        debug!(target, "resolving navigation target");
        self.resolve_group(session, target)?;
        session.lookup(target).ok_or_else(|| MappingError::CyclicResolution {
            type_name: target.to_string(),
            reason: "navigation target left no placeholder".to_string(),
        })
    }

    fn classify_level(&self, info: &TypeInfo) -> Result<Vec<ClassifiedMember>> {
        let mut members = classify(info, &self.config, |name| {
            self.model.contains(name) && !self.is_marker(name)
        })?;
        self.annotate_inverses(&info.name, &mut members);
        Ok(members)
    }

    /// Fills in inverse members, and for collections the foreign-key column
    /// the inverse reference persists through.
    ///
    /// A pair is recorded only when it is unambiguous: the declaring chain
    /// holds exactly one navigation of that kind to the target, and the
    /// target chain holds exactly one navigation back.
    fn annotate_inverses(&self, declaring: &str, members: &mut [ClassifiedMember]) {
        let own_chain: Vec<String> = match self.member_chain(declaring) {
            Ok(chain) => chain.into_iter().map(|t| t.name.clone()).collect(),
            Err(_) => vec![declaring.to_string()],
        };
        let points_here = |name: &str| own_chain.iter().any(|n| n == name);

        for member in members.iter_mut() {
            match &mut member.kind {
                MemberKind::Reference(nav) => {
                    let target = nav.target.clone();
                    let sole = self.sole_member(declaring, |ty| {
                        matches!(ty, MemberType::Named(name) if *name == target)
                    });
                    if sole.is_none_or(|(_, m)| m.name != nav.member) {
                        continue;
                    }
                    nav.inverse = self
                        .sole_member(&nav.target, |ty| ty.element_type_name().is_some_and(points_here))
                        .map(|(_, back)| back.name.clone());
                }
                MemberKind::Collection(nav) => {
                    let target = nav.target.clone();
                    let sole = self.sole_member(declaring, |ty| ty.element_type_name() == Some(target.as_str()));
                    if sole.is_none_or(|(_, m)| m.name != nav.member) {
                        continue;
                    }
                    if let Some((holder, back)) = self.sole_member(&nav.target, |ty| {
                        matches!(ty, MemberType::Named(name) if points_here(name.as_str()))
                    }) {
                        nav.inverse = Some(back.name.clone());
                        nav.foreign_key = holder
                            .member(&self.config.foreign_key_for(&back.name))
                            .filter(|m| m.has_storage())
                            .map(|m| m.column_name().to_string());
                    }
                }
                _ => {}
            }
        }
    }

    /// The single storable member along `owner`'s member chain whose type
    /// matches `predicate`. Redeclarations count once, at their latest level.
    fn sole_member(
        &self,
        owner: &str,
        predicate: impl Fn(&MemberType) -> bool,
    ) -> Option<(&TypeInfo, &MemberDescriptor)> {
        let chain = self.member_chain(owner).ok()?;
        let mut seen: Vec<&str> = Vec::new();
        let mut found = None;
        for info in chain.into_iter().rev() {
            for m in &info.members {
                if seen.contains(&m.name.as_str()) {
                    continue;
                }
                seen.push(m.name.as_str());
                if m.has_storage() && predicate(&m.member_type) {
                    if found.is_some() {
                        return None;
                    }
                    found = Some((info, m));
                }
            }
        }
        found
    }

    /// Latest declaration of `member` along the type's member chain.
    fn declaration(&self, type_name: &str, member: &str) -> Result<&MemberDescriptor> {
        self.member_chain(type_name)?
            .into_iter()
            .rev()
            .find_map(|info| info.member(member))
            .ok_or_else(|| MappingError::UnknownMember {
                type_name: type_name.to_string(),
                member: member.to_string(),
            })
    }

    /// Types whose declared members apply to `type_name`: just the type
    /// under No-Inheritance, the walked chain otherwise.
    fn member_chain(&self, type_name: &str) -> Result<Vec<&TypeInfo>> {
        match self.config.strategy {
            Strategy::NoInheritance => Ok(vec![self.type_info(type_name)?]),
            _ => self.chain(type_name),
        }
    }

    fn chain(&self, type_name: &str) -> Result<Vec<&TypeInfo>> {
        walk(&self.model, type_name, self.config.base_marker.as_deref())
    }

    fn type_info(&self, type_name: &str) -> Result<&TypeInfo> {
        if self.is_marker(type_name) {
            return Err(MappingError::misconfigured(
                type_name,
                "the base marker itself cannot be mapped",
            ));
        }
        self.model
            .get(type_name)
            .ok_or_else(|| MappingError::UnmappedType(type_name.to_string()))
    }

    fn is_marker(&self, type_name: &str) -> bool {
        self.config.base_marker.as_deref() == Some(type_name)
    }
}

fn build_table(
    name: &str,
    owner: &str,
    members: Vec<ClassifiedMember>,
    types: Vec<String>,
) -> TableDescriptor {
    let mut columns = Vec::new();
    let mut navigations = Vec::new();
    for member in members {
        match member.kind {
            MemberKind::PrimaryKey(column) | MemberKind::Column(column) => columns.push(column),
            MemberKind::Reference(nav) | MemberKind::Collection(nav) => navigations.push(nav),
            MemberKind::Excluded => {}
        }
    }
    let primary_key = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();

    TableDescriptor {
        name: name.to_string(),
        owner: owner.to_string(),
        columns,
        primary_key,
        navigations,
        parent: None,
        types,
    }
}

fn placeholder(table: &TableDescriptor) -> Placeholder {
    Placeholder {
        table: table.name.clone(),
        owner: table.owner.clone(),
        key: table.key_columns().cloned().collect(),
    }
}

fn not_a_column(type_name: &str, member: &str, reason: &'static str) -> MappingError {
    MappingError::NotAColumn {
        type_name: type_name.to_string(),
        member: member.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemberDescriptor, ScalarType};

    fn model() -> TypeModel {
        [
            TypeInfo::new("Department")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("Name", ScalarType::String))
                .with_member(MemberDescriptor::collection("Employees", "Employee")),
            TypeInfo::new("Employee")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32))
                .with_member(MemberDescriptor::reference("Department", "Department")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_inverses_are_annotated_both_ways() {
        let builder = TableBuilder::new(model(), MappingConfig::default());

        let employee = builder.resolve_table("Employee").unwrap();
        let nav = employee.navigation("Department").unwrap();
        assert_eq!(nav.inverse.as_deref(), Some("Employees"));
        assert_eq!(nav.foreign_key.as_deref(), Some("DepartmentId"));

        let department = builder.resolve_table("Department").unwrap();
        let nav = department.navigation("Employees").unwrap();
        assert_eq!(nav.kind, NavigationKind::Collection);
        assert_eq!(nav.inverse.as_deref(), Some("Department"));
        assert_eq!(nav.foreign_key.as_deref(), Some("DepartmentId"));
    }

    #[test]
    fn test_cycle_resolves_in_one_session() {
        let builder = TableBuilder::new(model(), MappingConfig::default());
        builder.resolve("Department").unwrap();

        assert!(builder.registry().contains("Employee"));
        assert_eq!(builder.registry().session_count(), 1);
        builder.resolve("Employee").unwrap();
        assert_eq!(builder.registry().session_count(), 1);
    }

    #[test]
    fn test_foreign_key_type_must_match_target_key() {
        let model: TypeModel = [
            TypeInfo::new("Department").with_member(MemberDescriptor::scalar("Id", ScalarType::Guid)),
            TypeInfo::new("Employee")
                .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))
                .with_member(MemberDescriptor::scalar("DepartmentId", ScalarType::Int32))
                .with_member(MemberDescriptor::reference("Department", "Department")),
        ]
        .into_iter()
        .collect();

        let builder = TableBuilder::new(model, MappingConfig::default());
        let err = builder.resolve("Employee").unwrap_err();
        assert_eq!(
            err,
            MappingError::IncompatibleForeignKey {
                type_name: "Employee".to_string(),
                column: "DepartmentId".to_string(),
                target: "Department".to_string(),
                expected: ScalarType::Guid,
                found: ScalarType::Int32,
            }
        );
        assert!(builder.registry().is_empty());
    }

    #[test]
    fn test_base_marker_cannot_be_resolved() {
        let model: TypeModel = [TypeInfo::new("Entity")].into_iter().collect();
        let builder = TableBuilder::new(
            model,
            MappingConfig::new(Strategy::TablePerHierarchy).with_base_marker("Entity"),
        );
        let err = builder.resolve("Entity").unwrap_err();
        assert!(matches!(err, MappingError::MisconfiguredHierarchy { .. }));
    }

    #[test]
    fn test_navigation_target_table() {
        let builder = TableBuilder::new(model(), MappingConfig::default());
        let target = builder.navigation_target("Employee", "Department").unwrap();
        assert_eq!(target.name, "Department");

        let err = builder.navigation_target("Employee", "Name").unwrap_err();
        assert!(matches!(err, MappingError::UnknownMember { .. }));
    }
}
