//! Code unit trait and the standard module implementation
//!
//! A code unit is anything a loader can hand back for a dotted name: a unit
//! file parsed from disk, a module built in-process and registered with the
//! host, or a unit produced by a native library. Hosts only ever see the
//! [`CodeUnit`] trait.

use crate::errors::EngineError;
use crate::types::{TypeInfo, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the registration function a native unit library must export
pub const REGISTER_SYMBOL: &[u8] = b"scout_unit_register";

/// Trait that all loaded units implement
pub trait CodeUnit: Send + Sync {
    /// Fully-qualified dotted name of the unit
    fn name(&self) -> &str;

    /// Explicit export list, if the unit declares one
    fn exports(&self) -> Option<Vec<String>> {
        None
    }

    /// Every attribute name the unit defines, sorted
    fn attribute_names(&self) -> Vec<String>;

    /// Look up one attribute
    fn get_attr(&self, name: &str) -> Result<Value, EngineError>;

    /// Where the unit was loaded from, if it came from disk
    fn origin(&self) -> Option<&Path> {
        None
    }
}

/// The standard [`CodeUnit`] implementation
///
/// # Examples
///
/// ```
/// use sdk::unit::{CodeUnit, Module};
/// use sdk::types::{TypeInfo, Value};
///
/// let mut module = Module::new("shapes");
/// module.define("version", Value::data("1.0"));
/// module.define_type(TypeInfo::new("shapes", "Circle"));
///
/// assert_eq!(module.attribute_names(), vec!["Circle", "version"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    exports: Option<Vec<String>>,
    attributes: BTreeMap<String, Value>,
    origin: Option<PathBuf>,
}

impl Module {
    /// Create an empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare an explicit export list
    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = Some(exports.into_iter().map(Into::into).collect());
        self
    }

    /// Record where the module was loaded from
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Builder form of [`Module::define`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.define(name, value);
        self
    }

    /// Define or replace an attribute
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Define a type under its own name and return the shared handle
    pub fn define_type(&mut self, ty: TypeInfo) -> Arc<TypeInfo> {
        let ty = Arc::new(ty);
        self.attributes
            .insert(ty.name().to_string(), Value::Type(Arc::clone(&ty)));
        ty
    }
}

impl CodeUnit for Module {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Option<Vec<String>> {
        self.exports.clone()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn get_attr(&self, name: &str) -> Result<Value, EngineError> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::attribute(&self.name, name))
    }

    fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

/// Export a native unit constructor from a `cdylib`
///
/// The constructor must be a `fn() -> T` where `T: CodeUnit`. The host loads
/// the library and calls the generated `scout_unit_register` function.
///
/// ```ignore
/// fn build() -> sdk::unit::Module {
///     sdk::unit::Module::new("native_shapes")
/// }
///
/// sdk::declare_unit!(build);
/// ```
#[macro_export]
macro_rules! declare_unit {
    ($constructor:path) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn scout_unit_register() -> *mut dyn $crate::unit::CodeUnit {
            let unit: Box<dyn $crate::unit::CodeUnit> = Box::new($constructor());
            Box::into_raw(unit)
        }
    };
}
