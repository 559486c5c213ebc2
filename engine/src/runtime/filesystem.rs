//! Loader for unit files on disk
//!
//! Resolves a dotted name against a list of search paths the way a package
//! importer does: `a.b` is `a/b/` (a package) or `a/b.<ext>` (a module) under
//! one of the roots, with `a` loaded first. The loader also provides the
//! primary walking facility used by discovery.

use super::{native, Loader, UnitWalk};
use crate::discovery::layout::{unit_stem, UnitKind, UnitLayout};
use sdk::{
    errors::EngineError,
    helpers::is_dotted_name,
    manifest::UnitManifest,
    types::Value,
    unit::{CodeUnit, Module},
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

/// Loads units from unit files, packages and native libraries
///
/// Successful loads are cached; failures are not, so a fixed unit file is
/// picked up on the next attempt. A unit that (through its bases) requires
/// itself while loading fails with `EngineError::CircularLoad`.
pub struct FileSystemLoader {
    search_paths: Vec<PathBuf>,
    layout: UnitLayout,
    cache: Mutex<HashMap<String, Arc<dyn CodeUnit>>>,
    loading: Mutex<HashSet<(ThreadId, String)>>,
}

/// Marks a unit as being loaded by the current thread until dropped
struct LoadGuard<'a> {
    loading: &'a Mutex<HashSet<(ThreadId, String)>>,
    key: (ThreadId, String),
}

impl<'a> LoadGuard<'a> {
    fn enter(loading: &'a Mutex<HashSet<(ThreadId, String)>>, name: &str) -> Option<Self> {
        let key = (thread::current().id(), name.to_string());
        let inserted = loading
            .lock()
            .expect("loading set lock poisoned")
            .insert(key.clone());
        inserted.then_some(Self { loading, key })
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut loading) = self.loading.lock() {
            loading.remove(&self.key);
        }
    }
}

impl FileSystemLoader {
    pub fn new(search_paths: Vec<PathBuf>, layout: UnitLayout) -> Self {
        Self {
            search_paths,
            layout,
            cache: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashSet::new()),
        }
    }

    /// Append a search path with the lowest priority
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn layout(&self) -> &UnitLayout {
        &self.layout
    }

    /// Whether `name` has been loaded and cached
    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache
            .lock()
            .expect("unit cache lock poisoned")
            .contains_key(name)
    }

    /// Find the file or directory that provides unit `name`
    ///
    /// Every search path is checked for a regular package, then a module
    /// file in extension priority order. A directory without a marker only
    /// counts when nothing else provides the name.
    pub fn locate(&self, name: &str) -> Option<(PathBuf, UnitKind)> {
        let mut segments: Vec<&str> = name.split('.').collect();
        let last = segments.pop()?;

        let mut namespace = None;
        for root in &self.search_paths {
            let dir = segments.iter().fold(root.clone(), |dir, s| dir.join(s));
            let package = dir.join(last);

            if let Some(UnitKind::Package) = self.layout.package_kind(&package) {
                return Some((package, UnitKind::Package));
            }
            for ext in self.layout.extensions() {
                let file = dir.join(format!("{}.{}", last, ext));
                if let Some(kind) = self.layout.module_kind(&file) {
                    return Some((file, kind));
                }
            }
            if namespace.is_none() && self.layout.package_kind(&package).is_some() {
                namespace = Some((package, UnitKind::Namespace));
            }
        }
        namespace
    }

    fn build(&self, name: &str, path: &Path, kind: UnitKind) -> Result<Arc<dyn CodeUnit>, EngineError> {
        match kind {
            UnitKind::Native => Ok(Arc::new(native::load_native_unit(name, path)?)),
            UnitKind::Namespace => Ok(Arc::new(Module::new(name).with_origin(path))),
            UnitKind::Package => {
                let marker = self.layout.marker_path(path);
                Ok(Arc::new(self.build_manifest(name, &marker)?))
            }
            UnitKind::Source | UnitKind::Compiled => Ok(Arc::new(self.build_manifest(name, path)?)),
        }
    }

    fn build_manifest(&self, name: &str, path: &Path) -> Result<Module, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::load_failed(name, e))?;
        let invalid = |reason: String| EngineError::InvalidUnit {
            path: path.to_path_buf(),
            reason,
        };

        let manifest = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => UnitManifest::from_json(&text).map_err(|e| invalid(e.to_string()))?,
            _ => UnitManifest::from_toml(&text).map_err(|e| invalid(e.to_string()))?,
        };

        manifest.build(name, path, |unit, item| {
            self.load(unit)
                .and_then(|loaded| Value::Unit(loaded).get_path(item))
                .map_err(|e| {
                    EngineError::load_failed(name, format!("cannot resolve base '{}:{}': {}", unit, item, e))
                })
        })
    }
}

impl Loader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn CodeUnit>, EngineError> {
        if !is_dotted_name(name) {
            return Err(EngineError::UnitNotFound(name.to_string()));
        }

        if let Some(unit) = self.cache.lock().expect("unit cache lock poisoned").get(name) {
            return Ok(Arc::clone(unit));
        }

        let _guard = LoadGuard::enter(&self.loading, name)
            .ok_or_else(|| EngineError::CircularLoad(name.to_string()))?;

        if let Some((parent, _)) = name.rsplit_once('.') {
            match self.load(parent) {
                Ok(_) => {}
                Err(EngineError::UnitNotFound(_)) => {
                    return Err(EngineError::UnitNotFound(name.to_string()))
                }
                Err(e) => return Err(EngineError::load_failed(name, e)),
            }
        }

        let (path, kind) = self
            .locate(name)
            .ok_or_else(|| EngineError::UnitNotFound(name.to_string()))?;

        tracing::debug!("Loading unit '{}' from {} ({:?})", name, path.display(), kind);
        let unit = self.build(name, &path, kind)?;

        let mut cache = self.cache.lock().expect("unit cache lock poisoned");
        Ok(Arc::clone(cache.entry(name.to_string()).or_insert(unit)))
    }

    fn walk_units<'a>(&'a self, roots: &[PathBuf], prefix: &str) -> Result<UnitWalk<'a>, EngineError> {
        Ok(Box::new(UnitWalker::new(&self.layout, roots.to_vec(), prefix)))
    }
}

/// One directory level of a walk
struct Frame {
    prefix: String,
    dirs: Vec<PathBuf>,
    /// Canonical forms of `dirs`
    canonical: Vec<PathBuf>,
    entries: Option<std::vec::IntoIter<WalkEntry>>,
}

/// A name found at one level, with the package directories behind it
struct WalkEntry {
    stem: String,
    package_dirs: Vec<PathBuf>,
}

/// Depth-first walk over unit files and packages
///
/// Entries of one level are merged across every directory that provides the
/// level, sorted by name. Private and non-identifier names are skipped, and
/// each qualified name is yielded once. A package directory that resolves to
/// one already on the walk path (a symlink back up the tree) is yielded but
/// not entered. The first directory that cannot be listed ends the walk with
/// an error.
struct UnitWalker<'a> {
    layout: &'a UnitLayout,
    stack: Vec<Frame>,
    seen: HashSet<String>,
    failed: bool,
}

impl<'a> UnitWalker<'a> {
    fn new(layout: &'a UnitLayout, roots: Vec<PathBuf>, prefix: &str) -> Self {
        Self {
            layout,
            stack: vec![Frame {
                prefix: prefix.to_string(),
                canonical: canonical_dirs(&roots),
                dirs: roots,
                entries: None,
            }],
            seen: HashSet::new(),
            failed: false,
        }
    }

    fn list(&self, dirs: &[PathBuf]) -> Result<Vec<WalkEntry>, EngineError> {
        let mut merged: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for dir in dirs {
            let entries = std::fs::read_dir(dir).map_err(|e| EngineError::Enumeration {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
            for entry in entries {
                let path = entry?.path();
                let Some(kind) = self.layout.unit_kind(&path) else {
                    continue;
                };
                let Some(stem) = unit_stem(&path).filter(|s| !s.starts_with('_')) else {
                    continue;
                };
                let package_dirs = merged.entry(stem.to_string()).or_default();
                if kind.is_package() {
                    package_dirs.push(path);
                }
            }
        }

        Ok(merged
            .into_iter()
            .map(|(stem, package_dirs)| WalkEntry { stem, package_dirs })
            .collect())
    }
}

impl Iterator for UnitWalker<'_> {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            if self.stack[depth].entries.is_none() {
                match self.list(&self.stack[depth].dirs) {
                    Ok(listed) => self.stack[depth].entries = Some(listed.into_iter()),
                    Err(e) => {
                        self.failed = true;
                        self.stack.clear();
                        return Some(Err(e));
                    }
                }
            }

            let frame = &mut self.stack[depth];
            let Some(entry) = frame.entries.as_mut().and_then(Iterator::next) else {
                self.stack.pop();
                continue;
            };
            let name = format!("{}{}", frame.prefix, entry.stem);
            if !self.seen.insert(name.clone()) {
                continue;
            }
            if !entry.package_dirs.is_empty() {
                let canonical = canonical_dirs(&entry.package_dirs);
                let cycle = self
                    .stack
                    .iter()
                    .any(|frame| frame.canonical.iter().any(|dir| canonical.contains(dir)));
                if cycle {
                    tracing::debug!("Not entering '{}': directory is already on the walk path", name);
                } else {
                    self.stack.push(Frame {
                        prefix: format!("{}.", name),
                        dirs: entry.package_dirs,
                        canonical,
                        entries: None,
                    });
                }
            }
            return Some(Ok(name));
        }
    }
}

fn canonical_dirs(dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter().filter_map(|dir| dir.canonicalize().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn loader_for(root: &Path) -> FileSystemLoader {
        FileSystemLoader::new(vec![root.to_path_buf()], UnitLayout::default())
    }

    #[test]
    fn test_load_module_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shapes.toml"), "[symbols]\nversion = \"1.0\"\n").unwrap();

        let loader = loader_for(dir.path());
        let unit = loader.load("shapes").unwrap();
        assert_eq!(unit.name(), "shapes");
        assert_eq!(unit.get_attr("version").unwrap(), Value::data("1.0"));
        assert_eq!(unit.origin(), Some(dir.path().join("shapes.toml").as_path()));
    }

    #[test]
    fn test_load_package_and_submodule() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("__init__.toml"), "[symbols]\nlevel = 1\n").unwrap();
        fs::write(pkg.join("sub.toml"), "[symbols]\nlevel = 2\n").unwrap();

        let loader = loader_for(dir.path());
        let sub = loader.load("pkg.sub").unwrap();
        assert_eq!(sub.get_attr("level").unwrap(), Value::data(2));
        assert!(loader.is_loaded("pkg"));
        assert_eq!(
            loader.load("pkg").unwrap().get_attr("level").unwrap(),
            Value::data(1)
        );
    }

    #[test]
    fn test_namespace_package_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("ns")).unwrap();

        let loader = loader_for(dir.path());
        let unit = loader.load("ns").unwrap();
        assert!(unit.attribute_names().is_empty());

        let strict = FileSystemLoader::new(
            vec![dir.path().to_path_buf()],
            UnitLayout {
                implicit_packages: false,
                ..UnitLayout::default()
            },
        );
        assert!(matches!(strict.load("ns"), Err(EngineError::UnitNotFound(_))));
    }

    #[test]
    fn test_source_preferred_over_compiled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shapes.toml"), "[symbols]\nform = \"source\"\n").unwrap();
        fs::write(dir.path().join("shapes.json"), r#"{"symbols": {"form": "compiled"}}"#).unwrap();
        fs::write(dir.path().join("colors.json"), r#"{"symbols": {"red": 1}}"#).unwrap();

        let loader = loader_for(dir.path());
        assert_eq!(
            loader.load("shapes").unwrap().get_attr("form").unwrap(),
            Value::data("source")
        );
        assert_eq!(
            loader.load("colors").unwrap().get_attr("red").unwrap(),
            Value::data(1)
        );
    }

    #[test]
    fn test_external_base_loads_other_unit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("core.toml"), "[types.Plugin]\n").unwrap();
        fs::write(
            dir.path().join("echo.toml"),
            "[types.Echo]\nbases = [\"core:Plugin\"]\n",
        )
        .unwrap();

        let loader = loader_for(dir.path());
        let echo = loader.load("echo").unwrap().get_attr("Echo").unwrap();
        assert!(loader.is_loaded("core"));

        let plugin = loader.load("core").unwrap().get_attr("Plugin").unwrap();
        assert!(echo.as_type().unwrap().is_subclass_of(&plugin).unwrap());
    }

    #[test]
    fn test_circular_bases_fail() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.toml"), "[types.A]\nbases = [\"b:B\"]\n").unwrap();
        fs::write(dir.path().join("b.toml"), "[types.B]\nbases = [\"a:A\"]\n").unwrap();

        let loader = loader_for(dir.path());
        let err = loader.load("a").err().unwrap();
        assert!(matches!(err, EngineError::UnitLoadFailed { .. }));
        assert!(err.to_string().contains("Circular load of unit 'a'"));
        assert!(!loader.is_loaded("a"));
        assert!(!loader.is_loaded("b"));
    }

    #[test]
    fn test_invalid_unit_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[symbols\n").unwrap();

        let loader = loader_for(dir.path());
        assert!(matches!(
            loader.load("broken"),
            Err(EngineError::InvalidUnit { .. })
        ));

        fs::write(&path, "[symbols]\nfixed = true\n").unwrap();
        assert_eq!(
            loader.load("broken").unwrap().get_attr("fixed").unwrap(),
            Value::data(json!(true))
        );
    }

    #[test]
    fn test_missing_parent_means_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(dir.path());
        assert!(matches!(
            loader.load("nowhere.sub"),
            Err(EngineError::UnitNotFound(ref name)) if name == "nowhere.sub"
        ));
        assert!(matches!(loader.load("bad..name"), Err(EngineError::UnitNotFound(_))));
    }

    #[test]
    fn test_walk_depth_first_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("__init__.toml"), "").unwrap();
        fs::write(pkg.join("zeta.toml"), "").unwrap();
        fs::write(pkg.join("alpha.toml"), "").unwrap();
        fs::write(pkg.join("_private.toml"), "").unwrap();
        fs::write(dir.path().join("top.toml"), "").unwrap();
        fs::write(dir.path().join("top.json"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let loader = loader_for(dir.path());
        let names: Vec<String> = loader
            .walk_units(&[dir.path().to_path_buf()], "")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["pkg", "pkg.alpha", "pkg.zeta", "top"]);
        assert!(!loader.is_loaded("pkg"));
    }

    #[test]
    #[cfg(unix)]
    fn test_walk_does_not_follow_symlink_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("a.toml"), "").unwrap();
        std::os::unix::fs::symlink(&pkg, pkg.join("again")).unwrap();

        let loader = loader_for(dir.path());
        let names: Vec<String> = loader
            .walk_units(&[dir.path().to_path_buf()], "")
            .unwrap()
            .take(50)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["pkg", "pkg.a", "pkg.again"]);
    }

    #[test]
    fn test_walk_merges_roots() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir(first.path().join("ns")).unwrap();
        fs::create_dir(second.path().join("ns")).unwrap();
        fs::write(first.path().join("ns").join("a.toml"), "").unwrap();
        fs::write(second.path().join("ns").join("b.toml"), "").unwrap();

        let loader = FileSystemLoader::new(Vec::new(), UnitLayout::default());
        let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let names: Vec<String> = loader
            .walk_units(&roots, "plugins.")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["plugins.ns", "plugins.ns.a", "plugins.ns.b"]);
    }

    #[test]
    fn test_walk_stops_on_unlistable_root() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(dir.path());
        let mut walk = loader
            .walk_units(&[dir.path().join("missing")], "")
            .unwrap();
        assert!(matches!(walk.next(), Some(Err(EngineError::Enumeration { .. }))));
        assert!(walk.next().is_none());
    }
}
