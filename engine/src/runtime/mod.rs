//! Runtime module for loading code units
//!
//! This module provides the loaders discovery and resolution run on:
//! - Registry: units registered in-process by constructor functions
//! - FileSystemLoader: unit files, packages and native libraries under search paths
//! - LoaderChain: consults several loaders in order

pub mod filesystem;
pub mod native;
pub mod registry;

pub use filesystem::FileSystemLoader;
pub use registry::Registry;

use sdk::{errors::EngineError, unit::CodeUnit};
use std::path::PathBuf;
use std::sync::Arc;

/// Lazy sequence of qualified unit names produced by a loader's walker
pub type UnitWalk<'a> = Box<dyn Iterator<Item = Result<String, EngineError>> + 'a>;

/// Loads units by fully-qualified dotted name
///
/// Loading a unit may have side effects: a unit file can pull in the units
/// its types derive from, and a native library runs its registration
/// function.
pub trait Loader: Send + Sync {
    /// Load the unit called `name`
    fn load(&self, name: &str) -> Result<Arc<dyn CodeUnit>, EngineError>;

    /// Bulk walking facility over `roots`, seeded with `prefix`
    ///
    /// Loaders that cannot walk return `EngineError::WalkUnsupported`, which
    /// makes discovery fall back to its own directory scan.
    fn walk_units<'a>(
        &'a self,
        _roots: &[PathBuf],
        _prefix: &str,
    ) -> Result<UnitWalk<'a>, EngineError> {
        Err(EngineError::WalkUnsupported(
            "loader has no walking facility".to_string(),
        ))
    }
}

/// Consults loaders in order
///
/// `load` moves on to the next loader only when the current one reports
/// `UnitNotFound`; any other failure is final. `walk_units` uses the first
/// loader that supports walking.
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<Box<dyn Loader>>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader with lower priority than those already present
    pub fn with(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl Loader for LoaderChain {
    fn load(&self, name: &str) -> Result<Arc<dyn CodeUnit>, EngineError> {
        for loader in &self.loaders {
            match loader.load(name) {
                Err(EngineError::UnitNotFound(_)) => continue,
                other => return other,
            }
        }
        Err(EngineError::UnitNotFound(name.to_string()))
    }

    fn walk_units<'a>(
        &'a self,
        roots: &[PathBuf],
        prefix: &str,
    ) -> Result<UnitWalk<'a>, EngineError> {
        let mut last = EngineError::WalkUnsupported("no loaders configured".to_string());
        for loader in &self.loaders {
            match loader.walk_units(roots, prefix) {
                Ok(walk) => return Ok(walk),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::unit::Module;
    use serde_json::json;

    #[test]
    fn test_chain_falls_through_not_found() {
        let mut first = Registry::new();
        first.register_module(Module::new("alpha").with("source", json!("first")));
        let mut second = Registry::new();
        second.register_module(Module::new("alpha").with("source", json!("second")));
        second.register_module(Module::new("beta"));

        let chain = LoaderChain::new().with(first).with(second);
        assert_eq!(chain.len(), 2);

        let alpha = chain.load("alpha").unwrap();
        assert_eq!(alpha.get_attr("source").unwrap().as_data(), Some(&json!("first")));
        assert_eq!(chain.load("beta").unwrap().name(), "beta");
        assert!(matches!(
            chain.load("gamma"),
            Err(EngineError::UnitNotFound(_))
        ));
    }

    #[test]
    fn test_chain_stops_on_load_failure() {
        let mut broken = Registry::new();
        broken.register("alpha", || {
            Err(EngineError::load_failed("alpha", "constructor failed"))
        });
        let mut healthy = Registry::new();
        healthy.register_module(Module::new("alpha"));

        let chain = LoaderChain::new().with(broken).with(healthy);
        assert!(matches!(
            chain.load("alpha"),
            Err(EngineError::UnitLoadFailed { .. })
        ));
    }

    #[test]
    fn test_empty_chain_cannot_walk() {
        let chain = LoaderChain::new();
        assert!(chain.is_empty());
        assert!(matches!(
            chain.walk_units(&[], ""),
            Err(EngineError::WalkUnsupported(_))
        ));
    }
}
