//! Type-model loading with builder pattern and fallback chains.
//!
//! Provides [`ModelCatalog`] for an in-memory type model plus its origin and
//! [`CatalogBuilder`] for loading from several candidate sources with
//! automatic fallback.
//!
//! # Loading patterns
//!
//! ```no_run
//! use tablemap_catalog::ModelCatalog;
//!
//! // A directory with one type declaration per JSON/YAML file
//! let catalog = ModelCatalog::from_dir("model/").unwrap();
//! assert!(catalog.contains("Person"));
//!
//! // A single ModelBundle file
//! let catalog = ModelCatalog::from_bundle("model.yaml").unwrap();
//!
//! // A fallback chain
//! let catalog = ModelCatalog::builder()
//!     .from_dir("model/")
//!     .from_bundle("model.yaml")
//!     .build()
//!     .unwrap();
//! ```

use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tablemap_core::{
    ModelBundle, TypeInfo, TypeModel, ValidationError, validate_bundle, validate_type,
};
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Describes where a [`ModelCatalog`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// A directory of individual type declaration files.
    Directory(PathBuf),
    /// A single [`ModelBundle`] file.
    Bundle(PathBuf),
    /// Several sources merged or tried in turn.
    Multiple(Vec<CatalogSource>),
}

/// A loaded type model plus metadata about its origin.
///
/// # Examples
///
/// ```
/// use tablemap_catalog::ModelCatalog;
/// use tablemap_core::{ModelBundle, TypeInfo};
///
/// let mut bundle = ModelBundle::new("1.0.0");
/// bundle.types.push(TypeInfo::new("Person"));
///
/// let catalog = ModelCatalog::from_model_bundle(bundle, "inline".into()).unwrap();
/// assert_eq!(catalog.len(), 1);
/// assert_eq!(catalog.type_names(), vec!["Person"]);
/// ```
#[derive(Debug)]
pub struct ModelCatalog {
    model: TypeModel,
    name: Option<String>,
    source: CatalogSource,
}

impl ModelCatalog {
    /// Returns a new [`CatalogBuilder`] for configuring a fallback chain.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Loads a directory, or a bundle file, depending on what `path` is.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_bundle(path)
        }
    }

    /// Loads every `*.json`, `*.yaml`, and `*.yml` file in a directory, each
    /// holding one [`TypeInfo`]. Files are read in name order; other files
    /// are skipped.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::IoError`] if the directory or a file cannot be read.
    /// - [`CatalogError::JsonError`] / [`CatalogError::YamlError`] on parse
    ///   failures.
    /// - [`CatalogError::DuplicateType`] if two files declare the same type.
    /// - [`CatalogError::InvalidModel`] if a declaration is malformed.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() && Format::of(&file_path).is_some() {
                files.push(file_path);
            }
        }
        files.sort();

        let mut model = TypeModel::new();
        for file_path in &files {
            let info: TypeInfo = read_file(file_path)?;
            check_type(&info)?;
            insert_unique(&mut model, info, file_path)?;
        }
        debug!(path = %path.display(), types = model.len(), "loaded model directory");

        Ok(Self {
            model,
            name: None,
            source: CatalogSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a single [`ModelBundle`] file (JSON or YAML by extension).
    ///
    /// # Errors
    ///
    /// Same as [`from_dir`](Self::from_dir), plus
    /// [`CatalogError::UnsupportedFormat`] for unknown extensions.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bundle: ModelBundle = read_file(path)?;
        Self::from_model_bundle(bundle, path.to_path_buf())
    }

    /// Builds a catalog from an already parsed bundle.
    pub fn from_model_bundle(bundle: ModelBundle, origin: PathBuf) -> Result<Self> {
        if bundle.version.trim().is_empty() {
            return Err(ValidationError::EmptyBundleVersion.into());
        }

        let mut model = TypeModel::new();
        for info in bundle.types {
            check_type(&info)?;
            insert_unique(&mut model, info, &origin)?;
        }
        debug!(path = %origin.display(), types = model.len(), "loaded model bundle");

        Ok(Self {
            model,
            name: bundle.name,
            source: CatalogSource::Bundle(origin),
        })
    }

    /// Adds every type of `other`, failing on names already present.
    pub fn merge(&mut self, other: ModelCatalog) -> Result<()> {
        let origin = match &other.source {
            CatalogSource::Directory(path) | CatalogSource::Bundle(path) => path.clone(),
            CatalogSource::Multiple(_) => PathBuf::new(),
        };
        if let Some(name) = other.model.names().find(|name| self.model.contains(name)) {
            return Err(CatalogError::DuplicateType {
                name: name.to_string(),
                path: origin,
            });
        }
        for info in other.model.iter() {
            self.model.register(info.clone());
        }

        let previous = std::mem::replace(&mut self.source, CatalogSource::Multiple(Vec::new()));
        let mut sources = match previous {
            CatalogSource::Multiple(sources) => sources,
            single => vec![single],
        };
        sources.push(other.source);
        self.source = CatalogSource::Multiple(sources);
        if self.name.is_none() {
            self.name = other.name;
        }
        Ok(())
    }

    /// Looks up a type declaration by name.
    pub fn get(&self, type_name: &str) -> Option<&TypeInfo> {
        self.model.get(type_name)
    }

    /// Returns `true` if the catalog declares `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.model.contains(type_name)
    }

    /// Returns the number of declared types.
    pub fn len(&self) -> usize {
        self.model.len()
    }

    /// Returns `true` if the catalog declares no types.
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    /// Declared type names in name order.
    pub fn type_names(&self) -> Vec<&str> {
        self.model.names().collect()
    }

    /// Bundle name, when loaded from a named bundle.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    /// Consumes the catalog, returning the type model.
    pub fn into_model(self) -> TypeModel {
        self.model
    }

    /// Checks that every base type is declared or listed in
    /// `allowed_bases`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] as
    /// [`CatalogError::InvalidModel`].
    pub fn validate(&self, allowed_bases: &[&str]) -> Result<()> {
        let mut bundle = ModelBundle::new("catalog");
        bundle.types = self.model.iter().cloned().collect();
        match validate_bundle(&bundle, allowed_bases).into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// Builder for loading a [`ModelCatalog`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`CatalogError::NoSourcesAvailable`] is returned.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    sources: Vec<CatalogSource>,
}

impl CatalogBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of type declaration files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CatalogSource::Directory(path.into()));
        self
    }

    /// Adds a [`ModelBundle`] file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CatalogSource::Bundle(path.into()));
        self
    }

    /// Attempts to load the catalog from configured sources in order.
    pub fn build(self) -> Result<ModelCatalog> {
        if self.sources.is_empty() {
            return Err(CatalogError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();
        for source in &self.sources {
            let result = match source {
                CatalogSource::Directory(path) => ModelCatalog::from_dir(path),
                CatalogSource::Bundle(path) => ModelCatalog::from_bundle(path),
                CatalogSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut catalog) => {
                    catalog.source = CatalogSource::Multiple(all_sources);
                    return Ok(catalog);
                }
                Err(err) => debug!(?source, error = %err, "model source failed, trying next"),
            }
        }

        Err(CatalogError::NoSourcesAvailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = Format::of(path).ok_or_else(|| CatalogError::UnsupportedFormat(path.to_path_buf()))?;
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let value = match format {
        Format::Json => serde_json::from_reader(reader)?,
        Format::Yaml => serde_yaml::from_reader(reader)?,
    };
    Ok(value)
}

fn check_type(info: &TypeInfo) -> Result<()> {
    match validate_type(info).into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn insert_unique(model: &mut TypeModel, info: TypeInfo, origin: &Path) -> Result<()> {
    if model.contains(&info.name) {
        return Err(CatalogError::DuplicateType {
            name: info.name,
            path: origin.to_path_buf(),
        });
    }
    model.register(info);
    Ok(())
}
