//! Value types exposed by loaded units
//!
//! A loaded unit exposes its symbols as [`Value`]s. Values stand in for the
//! runtime objects a reflective host would inspect: plain data, named types
//! with bases (so "subclass of X" can be answered), and nested units.

use crate::errors::EngineError;
use crate::unit::CodeUnit;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Deepest base chain a subclass check will follow
pub const MAX_TYPE_DEPTH: usize = 64;

/// A symbol value held by a loaded unit
#[derive(Clone)]
pub enum Value {
    /// Plain constant data
    Data(serde_json::Value),
    /// A named type with bases and attributes
    Type(Arc<TypeInfo>),
    /// A nested code unit
    Unit(Arc<dyn CodeUnit>),
}

impl Value {
    /// Create a data value from anything convertible to JSON
    pub fn data(value: impl Into<serde_json::Value>) -> Self {
        Self::Data(value.into())
    }

    /// Short name of the value's variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Type(_) => "type",
            Self::Unit(_) => "unit",
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Arc<TypeInfo>> {
        match self {
            Self::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_unit(&self) -> Option<&Arc<dyn CodeUnit>> {
        match self {
            Self::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Human-readable identity, used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Data(data) => data.to_string(),
            Self::Type(ty) => ty.qualified_name(),
            Self::Unit(unit) => unit.name().to_string(),
        }
    }

    /// Look up an attribute of this value
    ///
    /// Units delegate to [`CodeUnit::get_attr`], types search their own
    /// attributes then their bases, and data values expose the keys of a JSON
    /// object.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AttributeNotFound` when the attribute is missing.
    pub fn get_attr(&self, name: &str) -> Result<Value, EngineError> {
        match self {
            Self::Unit(unit) => unit.get_attr(name),
            Self::Type(ty) => ty
                .attribute(name)
                .cloned()
                .ok_or_else(|| EngineError::attribute(ty.qualified_name(), name)),
            Self::Data(serde_json::Value::Object(map)) => map
                .get(name)
                .cloned()
                .map(Value::Data)
                .ok_or_else(|| EngineError::attribute(self.describe(), name)),
            Self::Data(_) => Err(EngineError::attribute(self.describe(), name)),
        }
    }

    /// Walk a dotted attribute path (`a.b.c`) left to right
    ///
    /// The first missing attribute aborts the walk; no partial result is
    /// returned.
    pub fn get_path(&self, path: &str) -> Result<Value, EngineError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or(path);
        let mut value = self.get_attr(first)?;
        for segment in segments {
            value = value.get_attr(segment)?;
        }
        Ok(value)
    }

    /// JSON rendering for CLI output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Data(data) => data.clone(),
            Self::Type(ty) => ty.to_json(),
            Self::Unit(unit) => serde_json::json!({
                "unit": unit.name(),
                "attributes": unit.attribute_names(),
            }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(data) => f.debug_tuple("Data").field(data).finish(),
            Self::Type(ty) => f.debug_tuple("Type").field(&ty.qualified_name()).finish(),
            Self::Unit(unit) => f.debug_tuple("Unit").field(&unit.name()).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Unit(a), Self::Unit(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::Data(value)
    }
}

impl From<Arc<TypeInfo>> for Value {
    fn from(value: Arc<TypeInfo>) -> Self {
        Self::Type(value)
    }
}

impl From<TypeInfo> for Value {
    fn from(value: TypeInfo) -> Self {
        Self::Type(Arc::new(value))
    }
}

impl From<Arc<dyn CodeUnit>> for Value {
    fn from(value: Arc<dyn CodeUnit>) -> Self {
        Self::Unit(value)
    }
}

/// A named type declared by a unit
///
/// Types are identified by their qualified name (`unit.Name`). Bases are held
/// by `Arc`, so a hierarchy is always acyclic once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    unit: String,
    name: String,
    bases: Vec<Arc<TypeInfo>>,
    attributes: BTreeMap<String, Value>,
}

impl TypeInfo {
    /// Create a type `name` declared in `unit`
    pub fn new(unit: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            name: name.into(),
            bases: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a base type
    pub fn with_base(mut self, base: Arc<TypeInfo>) -> Self {
        self.bases.push(base);
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn bases(&self) -> &[Arc<TypeInfo>] {
        &self.bases
    }

    /// `unit.Name`
    pub fn qualified_name(&self) -> String {
        if self.unit.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.unit, self.name)
        }
    }

    /// Names of the attributes declared directly on this type
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Find an attribute on this type or, failing that, on its bases in
    /// declaration order.
    ///
    /// A base shared by several paths of the hierarchy is searched once.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        let mut visited = HashSet::new();
        self.find_attribute(name, &mut visited)
    }

    fn find_attribute<'a>(
        &'a self,
        name: &str,
        visited: &mut HashSet<(&'a str, &'a str)>,
    ) -> Option<&'a Value> {
        if !visited.insert(self.identity()) {
            return None;
        }
        if let Some(value) = self.attributes.get(name) {
            return Some(value);
        }
        self.bases
            .iter()
            .find_map(|base| base.find_attribute(name, visited))
    }

    /// Whether this type is `base` or derives from it
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotAType` if `base` is not a type, and
    /// `EngineError::TypeHierarchyTooDeep` if the base chain is longer than
    /// [`MAX_TYPE_DEPTH`].
    pub fn is_subclass_of(&self, base: &Value) -> Result<bool, EngineError> {
        let base = base
            .as_type()
            .ok_or_else(|| EngineError::NotAType(base.describe()))?;
        let mut visited = HashSet::new();
        self.derives_from(base.identity(), 0, &mut visited)
    }

    /// `(unit, name)`, the key types are compared by
    fn identity(&self) -> (&str, &str) {
        (&self.unit, &self.name)
    }

    fn derives_from<'a>(
        &'a self,
        base: (&str, &str),
        depth: usize,
        visited: &mut HashSet<(&'a str, &'a str)>,
    ) -> Result<bool, EngineError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(EngineError::TypeHierarchyTooDeep(self.qualified_name()));
        }
        if self.identity() == base {
            return Ok(true);
        }
        // Already searched through another path
        if !visited.insert(self.identity()) {
            return Ok(false);
        }
        for parent in &self.bases {
            if parent.derives_from(base, depth + 1, visited)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn to_json(&self) -> serde_json::Value {
        let attributes: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::json!({
            "type": self.qualified_name(),
            "bases": self.bases.iter().map(|b| b.qualified_name()).collect::<Vec<_>>(),
            "attributes": attributes,
        })
    }
}

/// A symbol yielded by a discovery scan
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Qualified name of the unit the symbol was found in
    pub unit: String,
    /// Symbol name within the unit
    pub name: String,
    pub value: Value,
}

impl From<Symbol> for (String, Value) {
    fn from(symbol: Symbol) -> Self {
        (symbol.name, symbol.value)
    }
}
