use serde::{Deserialize, Serialize};

use crate::{TypeInfo, TypeModel};

/// Serializable model bundle used for loading and distributing type models.
///
/// A bundle groups multiple [`TypeInfo`] declarations with version metadata,
/// making it suitable for keeping a whole object model in one JSON or YAML
/// file.
///
/// # Examples
///
/// ```
/// use tablemap_core::*;
///
/// let mut bundle = ModelBundle::new("1.0.0");
/// bundle.name = Some("hr".into());
/// bundle.types.push(TypeInfo::new("Person"));
/// bundle.types.push(TypeInfo::new("Employee").with_base("Person"));
///
/// assert_eq!(bundle.type_count(), 2);
/// let model = bundle.into_model();
/// assert!(model.contains("Employee"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Bundle format version (populated from
    /// [`MODEL_FORMAT_VERSION`](crate::MODEL_FORMAT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    /// Model version (free-form, usually semver).
    pub version: String,
    /// Optional bundle name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional bundle description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type declarations included in this bundle.
    #[serde(default)]
    pub types: Vec<TypeInfo>,
}

impl ModelBundle {
    /// Creates an empty bundle.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            format_version: Some(crate::MODEL_FORMAT_VERSION.to_string()),
            version: version.into(),
            name: None,
            description: None,
            types: Vec::new(),
        }
    }

    /// Returns the number of types in this bundle.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Converts the bundle into a [`TypeModel`]. Later declarations of the
    /// same name replace earlier ones; run
    /// [`validate_bundle`](crate::validate_bundle) first to reject them.
    pub fn into_model(self) -> TypeModel {
        self.types.into_iter().collect()
    }
}
