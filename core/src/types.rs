//! Type model definitions for class hierarchy registration.
//!
//! The builder never inspects live objects. Instead every mappable type is
//! registered once as a [`TypeInfo`] describing its base type and the
//! members it declares, and the resulting [`TypeModel`] is treated as plain
//! read-only data afterwards. The types are designed for serialization with
//! [`serde`] so a model can be loaded from JSON or YAML catalogs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Format version written into new [`ModelBundle`](crate::ModelBundle)s.
pub const MODEL_FORMAT_VERSION: &str = "1.0";

/// Scalar value type of a member or column.
///
/// # Examples
///
/// ```
/// use tablemap_core::ScalarType;
///
/// assert!(ScalarType::Int32.is_identity_compatible());
/// assert!(ScalarType::Guid.is_identity_compatible());
/// assert!(!ScalarType::String.is_identity_compatible());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Byte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Double,
    String,
    Guid,
    DateTime,
    /// Binary payload (byte arrays map to this column type).
    Binary,
}

impl ScalarType {
    const ALL: [ScalarType; 11] = [
        Self::Bool,
        Self::Byte,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Decimal,
        Self::Double,
        Self::String,
        Self::Guid,
        Self::DateTime,
        Self::Binary,
    ];

    /// Returns `true` for types usable as an identity/ordinal primary key.
    pub fn is_identity_compatible(self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64 | Self::Guid)
    }

    /// Lowercase keyword used in catalogs (`int32`, `date_time`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::String => "string",
            Self::Guid => "guid",
            Self::DateTime => "date_time",
            Self::Binary => "binary",
        }
    }

    /// Parses a catalog keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.keyword() == keyword)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Declared type of a member.
///
/// A byte array is modelled as `Array(Scalar(Byte))`; the classifier maps it
/// to a [`ScalarType::Binary`] column even though it is container shaped.
///
/// Catalogs spell member types as strings: a scalar keyword (`int32`), a
/// type name (`Department`), or a bracketed element type (`[Employee]`,
/// `[byte]`). `bytes` is accepted as shorthand for `[byte]`. Keywords win
/// over type names, which is why [`validate_type`](crate::validate_type)
/// rejects types named like a keyword.
///
/// # Examples
///
/// ```
/// use tablemap_core::{MemberType, ScalarType};
///
/// assert!(MemberType::bytes().is_byte_array());
/// assert_eq!(MemberType::list_of("Employee").element_type_name(), Some("Employee"));
/// assert_eq!(MemberType::Scalar(ScalarType::Int32).element_type_name(), None);
///
/// let parsed: MemberType = "[Employee]".parse().unwrap();
/// assert_eq!(parsed, MemberType::list_of("Employee"));
/// assert_eq!(MemberType::bytes().to_string(), "[byte]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MemberType {
    /// A scalar value stored in a single column.
    Scalar(ScalarType),
    /// A singular reference to another registered type.
    Named(String),
    /// A container of the element type.
    Array(Box<MemberType>),
}

impl MemberType {
    /// Byte array (`Array(Scalar(Byte))`).
    pub fn bytes() -> Self {
        Self::Array(Box::new(Self::Scalar(ScalarType::Byte)))
    }

    /// Singular reference to `type_name`.
    pub fn named(type_name: &str) -> Self {
        Self::Named(type_name.to_string())
    }

    /// Container of `type_name` elements.
    pub fn list_of(type_name: &str) -> Self {
        Self::Array(Box::new(Self::Named(type_name.to_string())))
    }

    /// Returns `true` if this is an array of bytes.
    pub fn is_byte_array(&self) -> bool {
        matches!(self, Self::Array(inner) if **inner == Self::Scalar(ScalarType::Byte))
    }

    /// Name of the element type for `Array(Named(_))`.
    pub fn element_type_name(&self) -> Option<&str> {
        match self {
            Self::Array(inner) => match inner.as_ref() {
                Self::Named(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Scalar type for `Scalar(_)`.
    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.write_str(scalar.keyword()),
            Self::Named(name) => f.write_str(name),
            Self::Array(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl FromStr for MemberType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("member type cannot be empty".to_string());
        }
        if s == "bytes" {
            return Ok(Self::bytes());
        }
        if let Some(inner) = s.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated array type: {s}"))?;
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }
        if s.contains(['[', ']']) {
            return Err(format!("invalid member type: {s}"));
        }
        Ok(ScalarType::from_keyword(s)
            .map(Self::Scalar)
            .unwrap_or_else(|| Self::Named(s.to_string())))
    }
}

impl TryFrom<String> for MemberType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MemberType> for String {
    fn from(value: MemberType) -> Self {
        value.to_string()
    }
}

/// How a member's value can be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Readable and writable, backed by storage (the default).
    #[default]
    ReadWrite,
    /// Backed by storage but not writable after construction.
    ReadOnly,
    /// Computed from other members; has no backing storage.
    Computed,
}

/// One member declared on a registered type.
///
/// # Examples
///
/// ```
/// use tablemap_core::{Access, MemberDescriptor, ScalarType};
///
/// let name = MemberDescriptor::scalar("Name", ScalarType::String).nullable();
/// assert!(name.nullable);
/// assert!(name.has_storage());
///
/// let full_name = MemberDescriptor::scalar("FullName", ScalarType::String).computed();
/// assert_eq!(full_name.access, Access::Computed);
/// assert!(!full_name.has_storage());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member name as declared on the type.
    pub name: String,
    /// Declared type of the member.
    #[serde(rename = "type")]
    pub member_type: MemberType,
    /// Accessor capability.
    #[serde(default)]
    pub access: Access,
    /// Whether the member accepts null.
    #[serde(default)]
    pub nullable: bool,
    /// Column name override from an external mapping declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Explicitly excluded from mapping.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
}

impl MemberDescriptor {
    /// Creates a read-write member of the given type.
    pub fn new(name: &str, member_type: MemberType) -> Self {
        Self {
            name: name.to_string(),
            member_type,
            access: Access::ReadWrite,
            nullable: false,
            column: None,
            ignored: false,
        }
    }

    /// Creates a scalar member.
    pub fn scalar(name: &str, scalar: ScalarType) -> Self {
        Self::new(name, MemberType::Scalar(scalar))
    }

    /// Creates a byte-array member.
    pub fn bytes(name: &str) -> Self {
        Self::new(name, MemberType::bytes()).nullable()
    }

    /// Creates a singular reference to `target`.
    pub fn reference(name: &str, target: &str) -> Self {
        Self::new(name, MemberType::named(target)).nullable()
    }

    /// Creates a container of `element` references.
    pub fn collection(name: &str, element: &str) -> Self {
        Self::new(name, MemberType::list_of(element))
    }

    /// Marks the member as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the member as computed (no backing storage).
    pub fn computed(mut self) -> Self {
        self.access = Access::Computed;
        self
    }

    /// Marks the member as read-only but stored.
    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    /// Overrides the column name.
    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    /// Excludes the member from mapping.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Returns `true` when the member has independent backing storage.
    pub fn has_storage(&self) -> bool {
        !self.ignored && self.access != Access::Computed
    }

    /// Column name: the override if present, otherwise the member name.
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// A registered type: its base, table override, and declared members.
///
/// Only members declared on this type are listed; inherited members live on
/// the base type's `TypeInfo`. Redeclaring a base member here is an
/// override.
///
/// # Examples
///
/// ```
/// use tablemap_core::{MemberDescriptor, ScalarType, TypeInfo};
///
/// let employee = TypeInfo::new("Employee")
///     .with_base("Person")
///     .with_member(MemberDescriptor::scalar("Salary", ScalarType::Decimal));
///
/// assert_eq!(employee.base.as_deref(), Some("Person"));
/// assert_eq!(employee.table_name(), "Employee");
/// assert!(employee.member("Salary").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Type identity.
    pub name: String,
    /// Direct base type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Abstract types are never resolved on their own by `resolve_all`.
    #[serde(default, rename = "abstract", skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    /// Table name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Members declared on this type, in declaration order.
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
}

impl TypeInfo {
    /// Creates a type with no base and no members.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base: None,
            is_abstract: false,
            table: None,
            members: Vec::new(),
        }
    }

    /// Sets the direct base type.
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    /// Overrides the table name.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Marks the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Appends a declared member.
    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Finds a declared member by name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Table name: the override if present, otherwise the type name.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// Registry of every mappable type, keyed by type name.
///
/// Populated once and read-only afterwards. Iteration order is by name,
/// which keeps resolution output deterministic.
///
/// # Examples
///
/// ```
/// use tablemap_core::{TypeInfo, TypeModel};
///
/// let model: TypeModel = [
///     TypeInfo::new("Person"),
///     TypeInfo::new("Employee").with_base("Person"),
///     TypeInfo::new("Customer").with_base("Person"),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(model.len(), 3);
/// let derived: Vec<_> = model.derived_types("Person").iter().map(|t| t.name.as_str()).collect();
/// assert_eq!(derived, vec!["Customer", "Employee"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeModel {
    types: BTreeMap<String, TypeInfo>,
}

impl TypeModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type, returning the previous registration of that name.
    pub fn register(&mut self, info: TypeInfo) -> Option<TypeInfo> {
        self.types.insert(info.name.clone(), info)
    }

    /// Registers a type and returns the model (builder style).
    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.register(info);
        self
    }

    /// Looks up a registered type.
    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Direct subtypes of `name`, ordered by name.
    pub fn derived_types(&self, name: &str) -> Vec<&TypeInfo> {
        self.types
            .values()
            .filter(|t| t.base.as_deref() == Some(name))
            .collect()
    }

    /// Registered type names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<TypeInfo> for TypeModel {
    fn from_iter<I: IntoIterator<Item = TypeInfo>>(iter: I) -> Self {
        let mut model = Self::new();
        for info in iter {
            model.register(info);
        }
        model
    }
}
