//! Filters applied while discovering units
//!
//! A [`Condition`] answers two questions: whether a filesystem entry is worth
//! treating as a candidate unit, and whether a symbol found in a loaded unit
//! should be yielded. Both have defaults, so implementors override only the
//! axis they care about.

use super::layout::UnitLayout;
use sdk::helpers::is_public;
use sdk::types::Value;
use std::path::Path;

/// Two-axis discovery filter
pub trait Condition {
    /// Whether the entry at `path`, which would be named `name`, is a candidate
    fn accept_path(&self, name: &str, path: &Path, layout: &UnitLayout) -> bool {
        accept_public_path(name, path, layout)
    }

    /// Whether symbol `name` of unit `unit` should be yielded
    fn accept_symbol(&self, _unit: &str, name: &str, _value: &Value) -> bool {
        is_public(name)
    }
}

/// Default path policy: a public name on an importable entry
pub fn accept_public_path(name: &str, path: &Path, layout: &UnitLayout) -> bool {
    is_public(name) && layout.is_importable(path)
}

/// Accepts every importable, non-private unit and symbol
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOnly;

impl Condition for PublicOnly {}

/// Accepts public symbols that are types deriving from `base`
///
/// A type counts as deriving from itself. Any failure while checking the
/// relationship (the base is not a type, the hierarchy is too deep) rejects
/// the symbol.
#[derive(Debug, Clone)]
pub struct IsSubclass {
    base: Value,
}

impl IsSubclass {
    pub fn new(base: impl Into<Value>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Value {
        &self.base
    }
}

impl Condition for IsSubclass {
    fn accept_symbol(&self, unit: &str, name: &str, value: &Value) -> bool {
        if !is_public(name) {
            return false;
        }
        let Value::Type(ty) = value else {
            return false;
        };
        match ty.is_subclass_of(&self.base) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::debug!("Subclass check rejected {}.{}: {}", unit, name, e);
                false
            }
        }
    }
}

/// A bare closure filters symbols only; paths use the default policy
impl<F> Condition for F
where
    F: Fn(&str, &str, &Value) -> bool,
{
    fn accept_symbol(&self, unit: &str, name: &str, value: &Value) -> bool {
        self(unit, name, value)
    }
}
