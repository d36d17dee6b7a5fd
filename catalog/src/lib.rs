//! Type-model loading and catalog configuration for tablemap.
//!
//! This crate loads [`TypeModel`](tablemap_core::TypeModel)s from JSON or
//! YAML sources (directories of per-type files or single bundles) and reads
//! the YAML configuration that ties a model to a strategy and a dialect.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tablemap_catalog::{CatalogConfig, ModelCatalog};
//!
//! // Load types from a directory
//! let catalog = ModelCatalog::from_dir("model/").unwrap();
//! println!("{} types", catalog.len());
//!
//! // Or go through a configuration file
//! let config = CatalogConfig::load("tablemap.yml").unwrap();
//! let builder = Arc::new(config.table_builder().unwrap());
//! let engine = config.engine(builder);
//! println!("{}", engine.escaped_table("Employee").unwrap());
//! ```

mod config;
mod error;
mod loader;

pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use loader::{CatalogBuilder, CatalogSource, ModelCatalog};
