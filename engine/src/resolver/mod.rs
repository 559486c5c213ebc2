//! Resolution of one symbol from a spec string
//!
//! A spec string is `module.path[:item.path]`. Each module segment goes
//! through an alias table, the resulting module is loaded, and the item path
//! is walked one attribute at a time. Unlike discovery, resolution is strict:
//! any failure is returned to the caller.
//!
//! # Examples
//!
//! ```
//! use scout_engine::resolver::{resolve, Translation};
//! use scout_engine::runtime::Registry;
//! use sdk::types::Value;
//! use sdk::unit::Module;
//!
//! let mut registry = Registry::new();
//! registry.register_module(Module::new("numpy.random").with("seed", Value::data(7)));
//!
//! let seed = resolve(&registry, "np.random:seed", &Translation::default()).unwrap();
//! assert_eq!(seed, Value::data(7));
//! ```

use crate::runtime::Loader;
use sdk::errors::EngineError;
use sdk::types::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parsed `module.path[:item.path]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecString {
    module: Vec<String>,
    item: Option<Vec<String>>,
}

impl SpecString {
    /// Module path segments, untranslated
    pub fn module_segments(&self) -> &[String] {
        &self.module
    }

    /// Item path segments, if an item part was given
    pub fn item_segments(&self) -> Option<&[String]> {
        self.item.as_deref()
    }

    /// Dotted module name after translating each segment
    pub fn module_name(&self, translation: &Translation) -> String {
        self.module
            .iter()
            .map(|segment| translation.translate(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl FromStr for SpecString {
    type Err = EngineError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (module, item) = match spec.split_once(':') {
            Some((module, item)) => (module, Some(item)),
            None => (spec, None),
        };

        if module.is_empty() {
            return Err(invalid("module path is empty"));
        }
        let module: Vec<String> = module.split('.').map(str::to_string).collect();
        if module.iter().any(String::is_empty) {
            return Err(invalid("module path has an empty segment"));
        }

        let item = match item.filter(|item| !item.is_empty()) {
            Some(item) => {
                let segments: Vec<String> = item.split('.').map(str::to_string).collect();
                if segments.iter().any(String::is_empty) {
                    return Err(invalid("item path has an empty segment"));
                }
                Some(segments)
            }
            None => None,
        };

        Ok(Self { module, item })
    }
}

impl fmt::Display for SpecString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module.join("."))?;
        if let Some(item) = &self.item {
            write!(f, ":{}", item.join("."))?;
        }
        Ok(())
    }
}

/// Alias table for module path segments
///
/// The default table maps `np` to `numpy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    aliases: BTreeMap<String, String>,
}

impl Default for Translation {
    fn default() -> Self {
        Self::identity().with_alias("np", "numpy")
    }
}

impl Translation {
    /// A table with no aliases
    pub fn identity() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), canonical.into());
        self
    }

    /// Replacement for `segment`, or the segment itself
    pub fn translate<'s>(&'s self, segment: &'s str) -> &'s str {
        self.aliases
            .get(segment)
            .map(String::as_str)
            .unwrap_or(segment)
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Translation {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            aliases: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Resolve `spec` through `loader`
///
/// Without an item part the loaded unit itself is returned.
///
/// # Errors
///
/// Returns `EngineError::InvalidSpec` for a malformed spec string, the
/// loader's error when the module cannot be loaded, and
/// `EngineError::AttributeNotFound` for the first missing attribute.
pub fn resolve(loader: &dyn Loader, spec: &str, translation: &Translation) -> Result<Value, EngineError> {
    let parsed: SpecString = spec.parse()?;
    let module = parsed.module_name(translation);

    let unit = loader.load(&module).map_err(|e| {
        tracing::error!("Failed to resolve '{}': {}", spec, e);
        e
    })?;

    let mut value = Value::Unit(unit);
    for segment in parsed.item_segments().unwrap_or_default() {
        value = value.get_attr(segment).map_err(|e| {
            tracing::error!("Failed to resolve '{}': {}", spec, e);
            e
        })?;
    }
    Ok(value)
}

/// A loader paired with an alias table
pub struct Resolver<'a> {
    loader: &'a dyn Loader,
    translation: Translation,
}

impl<'a> Resolver<'a> {
    pub fn new(loader: &'a dyn Loader) -> Self {
        Self {
            loader,
            translation: Translation::default(),
        }
    }

    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translation = translation;
        self
    }

    pub fn translation(&self) -> &Translation {
        &self.translation
    }

    pub fn resolve(&self, spec: &str) -> Result<Value, EngineError> {
        resolve(self.loader, spec, &self.translation)
    }
}
