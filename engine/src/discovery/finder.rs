//! Symbol discovery over enumerated units

use super::{Condition, ScanFailure, ScanReport, UnitNames};
use crate::runtime::Loader;
use sdk::types::Symbol;
use sdk::unit::CodeUnit;
use std::sync::Arc;

/// Lazy sequence of accepted symbols
///
/// Candidates are loaded one at a time as the iterator is pulled. A unit that
/// fails to load, or a symbol that cannot be read, is logged and recorded in
/// [`Finder::failures`], and the scan moves on.
pub struct Finder<'a, C: ?Sized> {
    loader: &'a dyn Loader,
    condition: &'a C,
    names: UnitNames<'a, C>,
    /// Unit being scanned, under the name it was enumerated as
    current: Option<(String, Arc<dyn CodeUnit>, std::vec::IntoIter<String>)>,
    failures: Vec<ScanFailure>,
    units_loaded: usize,
}

impl<'a, C: Condition + ?Sized> Finder<'a, C> {
    pub(crate) fn new(loader: &'a dyn Loader, condition: &'a C, names: UnitNames<'a, C>) -> Self {
        Self {
            loader,
            condition,
            names,
            current: None,
            failures: Vec::new(),
            units_loaded: 0,
        }
    }

    /// Failures recorded so far, in the order they happened
    pub fn failures(&self) -> &[ScanFailure] {
        &self.failures
    }

    /// Number of candidates loaded so far
    pub fn units_loaded(&self) -> usize {
        self.units_loaded
    }

    /// Whether enumeration switched to the directory scan
    pub fn used_fallback(&self) -> bool {
        self.names.used_fallback()
    }

    /// Run the scan to completion
    pub fn into_report(mut self) -> ScanReport {
        let symbols = self.by_ref().collect();
        ScanReport {
            symbols,
            failures: self.failures,
            units_loaded: self.units_loaded,
        }
    }

    fn next_unit(&mut self) -> Option<String> {
        let name = self.names.next();
        self.failures.append(&mut self.names.take_failures());
        name
    }

    fn open(&mut self, name: &str) {
        match self.loader.load(name) {
            Ok(unit) => {
                self.units_loaded += 1;
                let keys = unit.exports().unwrap_or_else(|| unit.attribute_names());
                tracing::debug!("Scanning {} symbols of '{}'", keys.len(), name);
                self.current = Some((name.to_string(), unit, keys.into_iter()));
            }
            Err(e) => {
                tracing::warn!("Skipping unit '{}': {}", name, e);
                self.failures.push(ScanFailure::load(name, &e));
            }
        }
    }
}

impl<C: Condition + ?Sized> Iterator for Finder<'_, C> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        loop {
            if let Some((name, unit, keys)) = &mut self.current {
                if let Some(key) = keys.next() {
                    match unit.get_attr(&key) {
                        Ok(value) => {
                            if self.condition.accept_symbol(name, &key, &value) {
                                return Some(Symbol {
                                    unit: name.clone(),
                                    name: key,
                                    value,
                                });
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Skipping symbol '{}' of '{}': {}", key, name, e);
                            self.failures.push(ScanFailure::attribute(name, &key, &e));
                        }
                    }
                    continue;
                }
                self.current = None;
            }

            let name = self.next_unit()?;
            self.open(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{Discovery, PublicOnly, ScanFailureKind, Strategy};
    use crate::runtime::Registry;
    use sdk::errors::EngineError;
    use sdk::types::Value;
    use sdk::unit::Module;
    use serde_json::json;
    use std::fs;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_module(
            Module::new("pkg.listed")
                .with_exports(["shown", "missing"])
                .with("shown", json!(1))
                .with("unlisted", json!(2)),
        );
        registry.register_module(
            Module::new("pkg.plain")
                .with("alpha", json!("a"))
                .with("_secret", json!("s")),
        );
        registry.register("pkg.broken", || {
            Err(EngineError::load_failed("pkg.broken", "constructor failed"))
        });
        registry
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        for name in ["broken", "listed", "plain"] {
            fs::write(pkg.join(format!("{}.toml", name)), "").unwrap();
        }
        dir
    }

    #[test]
    fn test_exports_and_failures() {
        let dir = tree();
        let registry = registry();
        let discovery = Discovery::new(&registry).with_strategy(Strategy::Fallback);
        let report = discovery
            .find(dir.path().join("pkg"), &PublicOnly, "pkg")
            .into_report();

        let found: Vec<(String, Value)> = report.symbols.into_iter().map(Into::into).collect();
        assert_eq!(
            found,
            vec![
                ("shown".to_string(), Value::data(1)),
                ("alpha".to_string(), Value::data("a")),
            ]
        );
        assert_eq!(report.units_loaded, 2);

        let kinds: Vec<ScanFailureKind> = report.failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![ScanFailureKind::Load, ScanFailureKind::Attribute]);
        assert_eq!(report.failures[1].target(), "pkg.listed.missing");
    }

    #[test]
    fn test_symbols_carry_enumerated_unit_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a").join("b.toml"), "").unwrap();

        let mut registry = Registry::new();
        registry.register("a.b", || Ok(Module::new("other").with("value", json!(7))));

        let seen_units = std::sync::Mutex::new(Vec::new());
        let condition = |unit: &str, _: &str, _: &Value| {
            seen_units.lock().unwrap().push(unit.to_string());
            true
        };
        let symbols: Vec<Symbol> = Discovery::new(&registry)
            .find(dir.path().join("a"), &condition, "a")
            .collect();

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].unit, "a.b");
        assert_eq!(*seen_units.lock().unwrap(), vec!["a.b"]);
    }

    #[test]
    fn test_dropping_early_skips_loads() {
        let dir = tree();
        let registry = registry();
        let discovery = Discovery::new(&registry).with_strategy(Strategy::Fallback);
        let mut finder = discovery.find(dir.path().join("pkg"), &PublicOnly, "pkg.");

        let first = finder.next().unwrap();
        assert_eq!(first.name, "shown");
        assert_eq!(finder.units_loaded(), 1);
        assert!(finder.used_fallback());
    }
}
