//! Unit manifest format
//!
//! A unit file declares the symbols of one unit. The source form is TOML; the
//! compiled form is the same structure serialized as JSON.
//!
//! ```toml
//! exports = ["Circle"]
//!
//! [symbols]
//! version = "1.0"
//!
//! [types.Shape]
//!
//! [types.Circle]
//! bases = ["Shape"]
//! [types.Circle.attributes]
//! sides = 1
//! ```
//!
//! A base is either a type declared in the same file or `unit.path:Item` in
//! another unit. Building a module resolves external bases through a caller
//! supplied function, which is where loading a unit can pull in other units.

use crate::errors::EngineError;
use crate::helpers::{is_dotted_name, is_identifier};
use crate::types::{TypeInfo, Value};
use crate::unit::Module;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Parsed unit file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitManifest {
    /// Explicit export list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    /// Plain constants
    #[serde(default)]
    pub symbols: BTreeMap<String, serde_json::Value>,
    /// Declared types
    #[serde(default)]
    pub types: BTreeMap<String, TypeEntry>,
}

/// Type declaration in a unit file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Reference to a base type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseRef<'a> {
    /// Declared in the same unit file
    Local(&'a str),
    /// `unit:item` in another unit
    External { unit: &'a str, item: &'a str },
}

impl<'a> BaseRef<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(':') {
            Some((unit, item)) => Self::External { unit, item },
            None => Self::Local(raw),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Active,
    Done,
}

impl UnitManifest {
    /// Parse the TOML source form
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Parse the JSON compiled form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the JSON compiled form
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check names and base references
    pub fn validate(&self) -> Result<(), String> {
        for name in self.symbols.keys() {
            if !is_identifier(name) {
                return Err(format!("invalid symbol name '{}'", name));
            }
            if self.types.contains_key(name) {
                return Err(format!("'{}' is declared as both a symbol and a type", name));
            }
        }

        for (name, entry) in &self.types {
            if !is_identifier(name) {
                return Err(format!("invalid type name '{}'", name));
            }
            if let Some(attr) = entry.attributes.keys().find(|a| !is_identifier(a)) {
                return Err(format!("invalid attribute name '{}' on type '{}'", attr, name));
            }
            for base in &entry.bases {
                let valid = match BaseRef::parse(base) {
                    BaseRef::Local(local) => is_identifier(local),
                    BaseRef::External { unit, item } => {
                        is_dotted_name(unit) && is_dotted_name(item)
                    }
                };
                if !valid {
                    return Err(format!("invalid base '{}' on type '{}'", base, name));
                }
            }
        }

        if let Some(exports) = &self.exports {
            if let Some(bad) = exports.iter().find(|e| !is_identifier(e)) {
                return Err(format!("invalid export name '{}'", bad));
            }
        }

        Ok(())
    }

    /// Local type names ordered so every base precedes the types deriving from it
    pub fn type_order(&self) -> Result<Vec<&str>, String> {
        let mut marks = BTreeMap::new();
        let mut order = Vec::with_capacity(self.types.len());
        for name in self.types.keys() {
            self.visit(name, &mut marks, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        order: &mut Vec<&'a str>,
    ) -> Result<(), String> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => return Err(format!("type '{}' inherits from itself", name)),
            None => {}
        }
        marks.insert(name, Mark::Active);

        if let Some(entry) = self.types.get(name) {
            for base in &entry.bases {
                if let BaseRef::Local(local) = BaseRef::parse(base) {
                    let (key, _) = self
                        .types
                        .get_key_value(local)
                        .ok_or_else(|| format!("type '{}' has unknown base '{}'", name, local))?;
                    self.visit(key, marks, order)?;
                }
            }
        }

        marks.insert(name, Mark::Done);
        order.push(name);
        Ok(())
    }

    /// Build the module for `unit`
    ///
    /// `resolve_external` is called with `(unit, item)` for every base that
    /// lives in another unit and must return that base's value.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidUnit` for malformed declarations, and
    /// whatever `resolve_external` returns when an external base cannot be
    /// produced.
    pub fn build<F>(
        &self,
        unit: &str,
        origin: &Path,
        mut resolve_external: F,
    ) -> Result<Module, EngineError>
    where
        F: FnMut(&str, &str) -> Result<Value, EngineError>,
    {
        let invalid = |reason: String| EngineError::InvalidUnit {
            path: origin.to_path_buf(),
            reason,
        };

        self.validate().map_err(invalid)?;
        let order = self.type_order().map_err(invalid)?;

        let mut module = Module::new(unit).with_origin(origin);
        if let Some(exports) = &self.exports {
            module = module.with_exports(exports.iter().cloned());
        }
        for (name, value) in &self.symbols {
            module.define(name.clone(), Value::Data(value.clone()));
        }

        let mut built: BTreeMap<&str, Arc<TypeInfo>> = BTreeMap::new();
        for name in order {
            let entry = self
                .types
                .get(name)
                .ok_or_else(|| invalid(format!("unknown type '{}'", name)))?;

            let mut ty = TypeInfo::new(unit, name);
            for base in &entry.bases {
                let base_ty = match BaseRef::parse(base) {
                    BaseRef::Local(local) => built
                        .get(local)
                        .cloned()
                        .ok_or_else(|| invalid(format!("unknown base '{}'", local)))?,
                    BaseRef::External { unit: other, item } => {
                        let value = resolve_external(other, item)?;
                        value
                            .as_type()
                            .cloned()
                            .ok_or_else(|| invalid(format!("base '{}' is not a type", base)))?
                    }
                };
                ty = ty.with_base(base_ty);
            }
            for (attr, value) in &entry.attributes {
                ty = ty.with_attribute(attr.clone(), Value::Data(value.clone()));
            }

            built.insert(name, module.define_type(ty));
        }

        Ok(module)
    }
}
