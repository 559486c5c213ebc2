//! Discovery of code units and the symbols they define
//!
//! Discovery runs in two stages:
//! - [`UnitNames`] enumerates candidate unit names under a set of roots,
//!   using the loader's walking facility first and a breadth-first
//!   directory scan when that is unavailable or fails
//! - [`Finder`] loads each candidate and yields the symbols a [`Condition`]
//!   accepts
//!
//! Both stages are lazy iterators. Failures that only affect one candidate
//! are logged, recorded as [`ScanFailure`]s and skipped.
//!
//! # Examples
//!
//! ```no_run
//! use scout_engine::discovery::{self, PublicOnly};
//! use scout_engine::runtime::FileSystemLoader;
//! use scout_engine::discovery::UnitLayout;
//!
//! let loader = FileSystemLoader::new(vec!["plugins".into()], UnitLayout::default());
//! for symbol in discovery::find(&loader, "plugins", &PublicOnly, "") {
//!     println!("{}.{}", symbol.unit, symbol.name);
//! }
//! ```

pub mod condition;
pub mod enumerator;
pub mod finder;
pub mod layout;

pub use condition::{Condition, IsSubclass, PublicOnly};
pub use enumerator::UnitNames;
pub use finder::Finder;
pub use layout::{UnitKind, UnitLayout};

use crate::runtime::Loader;
use sdk::errors::EngineError;
use sdk::types::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How candidate names are enumerated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Loader walk first, directory scan if the walk fails
    #[default]
    Auto,
    /// Loader walk only; a failure ends enumeration
    Walk,
    /// Directory scan only
    Fallback,
}

/// Ordered set of search roots
///
/// A single path converts into a one-element set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roots(Vec<PathBuf>);

impl Roots {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.0
    }
}

impl From<PathBuf> for Roots {
    fn from(path: PathBuf) -> Self {
        Self(vec![path])
    }
}

impl From<&Path> for Roots {
    fn from(path: &Path) -> Self {
        Self(vec![path.to_path_buf()])
    }
}

impl From<&str> for Roots {
    fn from(path: &str) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<Vec<PathBuf>> for Roots {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }
}

impl From<&[PathBuf]> for Roots {
    fn from(paths: &[PathBuf]) -> Self {
        Self(paths.to_vec())
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for Roots {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Stage of a scan a recoverable failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFailureKind {
    /// The loader walk failed, or a directory could not be listed
    Enumeration,
    /// A candidate unit failed to load
    Load,
    /// A symbol of a loaded unit could not be read
    Attribute,
}

impl fmt::Display for ScanFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumeration => write!(f, "enumeration"),
            Self::Load => write!(f, "load"),
            Self::Attribute => write!(f, "attribute"),
        }
    }
}

/// A recoverable failure recorded during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub kind: ScanFailureKind,
    /// Unit being loaded or inspected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Symbol being read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Directory being listed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ScanFailure {
    pub fn enumeration(path: Option<PathBuf>, error: &EngineError) -> Self {
        let path = match error {
            EngineError::Enumeration { path, .. } => Some(path.clone()),
            _ => path,
        };
        Self {
            kind: ScanFailureKind::Enumeration,
            unit: None,
            symbol: None,
            path,
            message: error.to_string(),
        }
    }

    pub fn load(unit: &str, error: &EngineError) -> Self {
        Self {
            kind: ScanFailureKind::Load,
            unit: Some(unit.to_string()),
            symbol: None,
            path: None,
            message: error.to_string(),
        }
    }

    pub fn attribute(unit: &str, symbol: &str, error: &EngineError) -> Self {
        Self {
            kind: ScanFailureKind::Attribute,
            unit: Some(unit.to_string()),
            symbol: Some(symbol.to_string()),
            path: None,
            message: error.to_string(),
        }
    }

    /// What the failure was about, for display
    pub fn target(&self) -> String {
        match (&self.unit, &self.symbol, &self.path) {
            (Some(unit), Some(symbol), _) => format!("{}.{}", unit, symbol),
            (Some(unit), None, _) => unit.clone(),
            (None, _, Some(path)) => path.display().to_string(),
            (None, _, None) => "<walk>".to_string(),
        }
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure at {}: {}", self.kind, self.target(), self.message)
    }
}

impl std::error::Error for ScanFailure {}

/// Everything a finished scan produced
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub symbols: Vec<Symbol>,
    pub failures: Vec<ScanFailure>,
    /// Number of candidate units that loaded successfully
    pub units_loaded: usize,
}

impl ScanReport {
    /// True when nothing was skipped, so an empty result means "no matches"
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Discovery settings bound to one loader
pub struct Discovery<'a> {
    loader: &'a dyn Loader,
    layout: UnitLayout,
    strategy: Strategy,
}

impl<'a> Discovery<'a> {
    pub fn new(loader: &'a dyn Loader) -> Self {
        Self {
            loader,
            layout: UnitLayout::default(),
            strategy: Strategy::default(),
        }
    }

    /// Layout the directory scan judges paths with
    pub fn with_layout(mut self, layout: UnitLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Enumerate candidate unit names under `roots`
    pub fn enumerate<C>(&self, roots: impl Into<Roots>, condition: &'a C, prefix: &str) -> UnitNames<'a, C>
    where
        C: Condition + ?Sized,
    {
        UnitNames::new(
            self.loader,
            roots.into(),
            condition,
            prefix,
            self.layout.clone(),
            self.strategy,
        )
    }

    /// Find symbols accepted by `condition` in the units under `roots`
    ///
    /// Every candidate is loaded, so any load-time side effect of a unit runs
    /// (loading the units its types derive from, or the registration function
    /// of a native library), even if none of its symbols end up accepted.
    pub fn find<C>(&self, roots: impl Into<Roots>, condition: &'a C, prefix: &str) -> Finder<'a, C>
    where
        C: Condition + ?Sized,
    {
        let prefix = normalize_prefix(prefix);
        Finder::new(self.loader, condition, self.enumerate(roots, condition, &prefix))
    }
}

/// Enumerate candidate unit names with the default layout and strategy
pub fn enumerate<'a, C>(
    loader: &'a dyn Loader,
    roots: impl Into<Roots>,
    condition: &'a C,
    prefix: &str,
) -> UnitNames<'a, C>
where
    C: Condition + ?Sized,
{
    Discovery::new(loader).enumerate(roots, condition, prefix)
}

/// Find accepted symbols with the default layout and strategy
///
/// Loading a candidate runs its load-time side effects; see
/// [`Discovery::find`].
pub fn find<'a, C>(
    loader: &'a dyn Loader,
    roots: impl Into<Roots>,
    condition: &'a C,
    prefix: &str,
) -> Finder<'a, C>
where
    C: Condition + ?Sized,
{
    Discovery::new(loader).find(roots, condition, prefix)
}

/// A non-empty prefix always ends with a dot
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('.') {
        prefix.to_string()
    } else {
        format!("{}.", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("plugins"), "plugins.");
        assert_eq!(normalize_prefix("plugins."), "plugins.");
    }

    #[test]
    fn test_single_path_becomes_one_root() {
        let roots = Roots::from("plugins");
        assert_eq!(roots.paths(), &[PathBuf::from("plugins")]);

        let roots: Roots = ["a", "b"].into_iter().collect();
        assert_eq!(roots.into_paths(), vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_strategy_serde() {
        let strategy: Strategy = serde_json::from_str("\"fallback\"").unwrap();
        assert_eq!(strategy, Strategy::Fallback);
        assert_eq!(Strategy::default(), Strategy::Auto);
    }

    #[test]
    fn test_failure_display() {
        let failure = ScanFailure::load("pkg.broken", &EngineError::UnitNotFound("pkg.broken".into()));
        assert_eq!(failure.target(), "pkg.broken");
        assert_eq!(
            failure.to_string(),
            "load failure at pkg.broken: Unit not found: pkg.broken"
        );

        let failure = ScanFailure::attribute("pkg", "Thing", &EngineError::attribute("pkg", "Thing"));
        assert_eq!(failure.target(), "pkg.Thing");
    }

    #[test]
    fn test_enumeration_failure_takes_error_path() {
        let error = EngineError::Enumeration {
            path: PathBuf::from("/nowhere"),
            reason: "gone".into(),
        };
        let failure = ScanFailure::enumeration(None, &error);
        assert_eq!(failure.path, Some(PathBuf::from("/nowhere")));
        assert_eq!(failure.kind, ScanFailureKind::Enumeration);
    }

    #[test]
    fn test_report_completeness() {
        let mut report = ScanReport::default();
        assert!(report.is_complete());
        report.failures.push(ScanFailure::enumeration(
            None,
            &EngineError::WalkUnsupported("registry".into()),
        ));
        assert!(!report.is_complete());
    }
}
