//! In-process unit registry
//!
//! Units that live inside the host binary register a constructor under their
//! dotted name. The constructor runs on first load, and the module it builds
//! is cached for later loads.

use super::Loader;
use sdk::{
    errors::EngineError,
    unit::{CodeUnit, Module},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Constructor = Box<dyn Fn() -> Result<Module, EngineError> + Send + Sync>;

/// Loader backed by registered constructors
///
/// # Examples
///
/// ```
/// use scout_engine::runtime::{Loader, Registry};
/// use sdk::unit::{CodeUnit, Module};
///
/// let mut registry = Registry::new();
/// registry.register("plugins.echo", || Ok(Module::new("plugins.echo")));
///
/// let unit = registry.load("plugins.echo").unwrap();
/// assert_eq!(unit.name(), "plugins.echo");
/// ```
#[derive(Default)]
pub struct Registry {
    constructors: HashMap<String, Constructor>,
    cache: Mutex<HashMap<String, Arc<dyn CodeUnit>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Module, EngineError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registering unit: {}", name);
        self.cache
            .lock()
            .expect("registry cache lock poisoned")
            .remove(&name);
        self.constructors.insert(name, Box::new(constructor));
        self
    }

    /// Register an already built module under its own name
    pub fn register_module(&mut self, module: Module) -> &mut Self {
        let name = module.name().to_string();
        self.register(name, move || Ok(module.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Loader for Registry {
    fn load(&self, name: &str) -> Result<Arc<dyn CodeUnit>, EngineError> {
        if let Some(unit) = self
            .cache
            .lock()
            .expect("registry cache lock poisoned")
            .get(name)
        {
            return Ok(Arc::clone(unit));
        }

        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| EngineError::UnitNotFound(name.to_string()))?;

        // Constructors may load other units, so the cache lock is not held here
        let module = constructor().map_err(|e| match e {
            EngineError::UnitLoadFailed { .. } => e,
            other => EngineError::load_failed(name, other),
        })?;
        let unit: Arc<dyn CodeUnit> = Arc::new(module);

        let mut cache = self.cache.lock().expect("registry cache lock poisoned");
        Ok(Arc::clone(cache.entry(name.to_string()).or_insert(unit)))
    }
}
