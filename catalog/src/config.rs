//! Catalog configuration for mapping a type model.
//!
//! Defines the YAML-serializable configuration that names the model sources,
//! the inheritance strategy and naming conventions, and the target SQL
//! dialect.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! dialect: sqlserver
//! mapping:
//!   strategy: table_per_type
//!   base_marker: Entity
//!   primary_key: Id
//!   foreign_key_suffix: Id
//! models:
//!   - model/
//!   - shared.yaml
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tablemap_core::{MappingConfig, TableBuilder, TypeModel};
use tablemap_engine::{Dialect, Engine};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::loader::ModelCatalog;

/// Top-level catalog configuration.
///
/// Loaded from a YAML file (typically `tablemap.yml`). Relative model paths
/// are resolved against the directory holding that file.
///
/// # Examples
///
/// ```no_run
/// use tablemap_catalog::CatalogConfig;
///
/// let config = CatalogConfig::load("tablemap.yml").unwrap();
/// let builder = config.table_builder().unwrap();
/// let table = builder.resolve_table("Employee").unwrap();
/// println!("Employee maps to {}", table.name);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Target SQL dialect.
    #[serde(default)]
    pub dialect: Dialect,
    /// Strategy and naming conventions.
    #[serde(default)]
    pub mapping: MappingConfig,
    /// Model directories and bundle files, merged in order.
    #[serde(default)]
    pub models: Vec<PathBuf>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl CatalogConfig {
    /// Creates a configuration with default conventions and no models.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            dialect: Dialect::default(),
            mapping: MappingConfig::default(),
            models: Vec::new(),
            base_dir: None,
        }
    }

    /// Adds a model source.
    pub fn with_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.models.push(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::CatalogError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: Self = serde_yaml::from_reader(reader)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::CatalogError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Model paths with relative entries resolved against the config file's
    /// directory.
    pub fn model_paths(&self) -> Vec<PathBuf> {
        self.models
            .iter()
            .map(|path| match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            })
            .collect()
    }

    /// Loads and merges every model source, then validates base types.
    /// The configured base marker may appear as a base without being
    /// declared.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NoSourcesAvailable`] when no models are configured.
    /// - [`CatalogError::DuplicateType`] when two sources declare a type.
    /// - Any loader or validation error of an individual source.
    pub fn load_model(&self) -> Result<TypeModel> {
        let mut paths = self.model_paths().into_iter();
        let first = paths.next().ok_or(CatalogError::NoSourcesAvailable)?;
        let mut catalog = ModelCatalog::open(first)?;
        for path in paths {
            catalog.merge(ModelCatalog::open(path)?)?;
        }

        let allowed: Vec<&str> = self.mapping.base_marker.as_deref().into_iter().collect();
        catalog.validate(&allowed)?;
        debug!(types = catalog.len(), strategy = %self.mapping.strategy, "model loaded");
        Ok(catalog.into_model())
    }

    /// Builds a [`TableBuilder`] over the loaded model.
    pub fn table_builder(&self) -> Result<TableBuilder> {
        let model = self.load_model()?;
        Ok(TableBuilder::new(model, self.mapping.clone()))
    }

    /// Engine for the configured dialect bound to `builder`.
    pub fn engine(&self, builder: Arc<TableBuilder>) -> Engine {
        Engine::new(self.dialect).with_builder(builder)
    }
}
