//! Shared cache of resolved mappings.
//!
//! The registry owns every [`TableMapping`] a builder has produced. Reads go
//! through an `RwLock` so resolved types are served concurrently. Resolution
//! itself runs in a [`Session`]: sessions are serialized by a mutex, keep
//! their in-progress placeholders private, and publish their results in one
//! write only when the whole session succeeded. A failed session leaves the
//! registry untouched, so every entry is always fully resolved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::descriptor::{ColumnDescriptor, TableDescriptor, TableMapping};
use crate::error::{MappingError, Result};
use crate::Strategy;

/// Thread-safe cache from type name to resolved mapping.
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let model: TypeModel = [TypeInfo::new("Tag")
///     .with_member(MemberDescriptor::scalar("Id", ScalarType::Int32))]
/// .into_iter()
/// .collect();
///
/// let builder = TableBuilder::new(model, MappingConfig::default());
/// assert!(builder.registry().is_empty());
///
/// builder.resolve("Tag").unwrap();
/// builder.resolve("Tag").unwrap();
/// assert!(builder.registry().contains("Tag"));
/// assert_eq!(builder.registry().session_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TableRegistry {
    entries: RwLock<HashMap<String, Arc<TableMapping>>>,
    resolution: Mutex<()>,
    sessions: AtomicUsize,
}

impl TableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mapping for `type_name` if it has been resolved.
    pub fn get(&self, type_name: &str) -> Option<Arc<TableMapping>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned()
    }

    /// Returns `true` if `type_name` has been resolved.
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(type_name)
    }

    /// Number of resolved types.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolved mappings sorted by type name.
    pub fn mappings(&self) -> Vec<Arc<TableMapping>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = entries.values().cloned().collect();
        out.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        out
    }

    /// Number of resolution sessions that ran to publication.
    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Drops every cached mapping. Waits for a running session to finish.
    pub fn clear(&self) {
        let _guard = self.resolution.lock().unwrap_or_else(PoisonError::into_inner);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Runs `resolve` in a fresh session unless `type_name` is already
    /// published, then returns its mapping.
    ///
    /// Only one session runs at a time. A caller that waited on another
    /// session re-checks the cache first, so concurrent first requests for
    /// one type produce a single session.
    pub(crate) fn run_session<F>(&self, type_name: &str, resolve: F) -> Result<Arc<TableMapping>>
    where
        F: FnOnce(&mut Session<'_>) -> Result<()>,
    {
        let _guard = self.resolution.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = self.get(type_name) {
            return Ok(hit);
        }

        let mut session = Session::new(self);
        resolve(&mut session)?;
        session.publish()?;
        self.sessions.fetch_add(1, Ordering::Relaxed);

        self.get(type_name).ok_or_else(|| MappingError::CyclicResolution {
            type_name: type_name.to_string(),
            reason: "session finished without resolving the requested type".to_string(),
        })
    }
}

/// Table name and key of a type, complete or still being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder {
    pub table: String,
    pub owner: String,
    pub key: Vec<ColumnDescriptor>,
}

impl Placeholder {
    fn of(table: &TableDescriptor) -> Self {
        Self {
            table: table.name.clone(),
            owner: table.owner.clone(),
            key: table.key_columns().cloned().collect(),
        }
    }
}

/// Mapping assembled at publication, once every table exists.
#[derive(Debug, Clone)]
pub(crate) struct PendingMapping {
    pub type_name: String,
    pub strategy: Strategy,
    /// Type owning the table that holds the type's most derived columns.
    pub owner: String,
    /// Table owners serving the type, root first.
    pub lineage: Vec<String>,
}

/// One resolution pass over a connected set of types.
#[derive(Debug)]
pub(crate) struct Session<'r> {
    registry: &'r TableRegistry,
    placeholders: HashMap<String, Placeholder>,
    tables: HashMap<String, Arc<TableDescriptor>>,
    pending: Vec<PendingMapping>,
}

impl<'r> Session<'r> {
    fn new(registry: &'r TableRegistry) -> Self {
        Self {
            registry,
            placeholders: HashMap::new(),
            tables: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Table name and key for `type_name`, from the registry or from this
    /// session's placeholders.
    pub fn lookup(&self, type_name: &str) -> Option<Placeholder> {
        if let Some(mapping) = self.registry.get(type_name) {
            return Some(Placeholder::of(&mapping.table));
        }
        let placeholder = self.placeholders.get(type_name).cloned();
        if placeholder.is_some() {
            debug!(type_name, "served placeholder for type in progress");
        }
        placeholder
    }

    /// Marks `type_name` as in progress.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::CyclicResolution`] if the type is already
    /// known to the registry or to this session.
    pub fn enter(&mut self, type_name: &str, placeholder: Placeholder) -> Result<()> {
        if self.placeholders.contains_key(type_name) || self.registry.contains(type_name) {
            return Err(MappingError::CyclicResolution {
                type_name: type_name.to_string(),
                reason: "type re-entered while already resolving".to_string(),
            });
        }
        self.placeholders.insert(type_name.to_string(), placeholder);
        Ok(())
    }

    /// Stores a finished table under its owner.
    pub fn complete(&mut self, table: TableDescriptor) {
        debug!(table = %table.name, owner = %table.owner, columns = table.columns.len(), "table completed");
        self.tables.insert(table.owner.clone(), Arc::new(table));
    }

    /// Queues a type mapping for publication.
    pub fn add_mapping(&mut self, pending: PendingMapping) {
        self.pending.push(pending);
    }

    fn table_for(&self, owner: &str) -> Result<Arc<TableDescriptor>> {
        if let Some(table) = self.tables.get(owner) {
            return Ok(Arc::clone(table));
        }
        self.registry
            .get(owner)
            .map(|mapping| Arc::clone(&mapping.table))
            .ok_or_else(|| MappingError::CyclicResolution {
                type_name: owner.to_string(),
                reason: "table was never completed".to_string(),
            })
    }

    fn publish(self) -> Result<()> {
        let mut mappings = Vec::with_capacity(self.pending.len());
        for pending in &self.pending {
            let hierarchy = pending
                .lineage
                .iter()
                .map(|owner| self.table_for(owner))
                .collect::<Result<Vec<_>>>()?;
            mappings.push(TableMapping {
                type_name: pending.type_name.clone(),
                strategy: pending.strategy,
                table: self.table_for(&pending.owner)?,
                hierarchy,
            });
        }

        debug!(types = mappings.len(), "publishing resolution session");
        let mut entries = self
            .registry
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for mapping in mappings {
            entries.insert(mapping.type_name.clone(), Arc::new(mapping));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScalarType;

    fn key() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor {
            member: "Id".to_string(),
            name: "Id".to_string(),
            declared_type: ScalarType::Int32,
            nullable: false,
            primary_key: true,
        }]
    }

    fn table(owner: &str) -> TableDescriptor {
        TableDescriptor {
            name: owner.to_string(),
            owner: owner.to_string(),
            columns: key(),
            primary_key: vec!["Id".to_string()],
            navigations: Vec::new(),
            parent: None,
            types: vec![owner.to_string()],
        }
    }

    fn placeholder(owner: &str) -> Placeholder {
        Placeholder {
            table: owner.to_string(),
            owner: owner.to_string(),
            key: key(),
        }
    }

    fn pending(type_name: &str) -> PendingMapping {
        PendingMapping {
            type_name: type_name.to_string(),
            strategy: Strategy::NoInheritance,
            owner: type_name.to_string(),
            lineage: vec![type_name.to_string()],
        }
    }

    #[test]
    fn test_reentering_type_is_cyclic() {
        let registry = TableRegistry::new();
        let mut session = Session::new(&registry);
        session.enter("A", placeholder("A")).unwrap();

        let err = session.enter("A", placeholder("A")).unwrap_err();
        assert!(matches!(err, MappingError::CyclicResolution { ref type_name, .. } if type_name == "A"));
    }

    #[test]
    fn test_placeholder_visible_only_inside_session() {
        let registry = TableRegistry::new();
        let mut session = Session::new(&registry);
        session.enter("A", placeholder("A")).unwrap();

        assert_eq!(session.lookup("A"), Some(placeholder("A")));
        assert!(registry.get("A").is_none());
    }

    #[test]
    fn test_failed_session_publishes_nothing() {
        let registry = TableRegistry::new();
        let err = registry
            .run_session("A", |session| {
                session.enter("A", placeholder("A"))?;
                session.complete(table("A"));
                session.add_mapping(pending("A"));
                Err(MappingError::UnmappedType("B".to_string()))
            })
            .unwrap_err();

        assert_eq!(err, MappingError::UnmappedType("B".to_string()));
        assert!(registry.is_empty());
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_publish_without_table_is_cyclic() {
        let registry = TableRegistry::new();
        let err = registry
            .run_session("A", |session| {
                session.enter("A", placeholder("A"))?;
                session.add_mapping(pending("A"));
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, MappingError::CyclicResolution { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_session_publishes_all_mappings() {
        let registry = TableRegistry::new();
        let mapping = registry
            .run_session("A", |session| {
                for name in ["A", "B"] {
                    session.enter(name, placeholder(name))?;
                    session.complete(table(name));
                    session.add_mapping(pending(name));
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(mapping.table.name, "A");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.session_count(), 1);

        let names: Vec<_> = registry.mappings().iter().map(|m| m.type_name.clone()).collect();
        assert_eq!(names, vec!["A", "B"]);

        registry.clear();
        assert!(registry.is_empty());
    }
}
