//! On-disk layout of loadable units
//!
//! Decides whether a filesystem entry is something a loader can turn into a
//! unit: a unit file with a recognized extension, or a package directory.

use crate::platform;
use sdk::helpers::is_identifier;
use std::path::{Path, PathBuf};

/// What kind of unit a filesystem entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Unit file in source form (TOML)
    Source,
    /// Unit file in compiled form (JSON)
    Compiled,
    /// Native shared library
    Native,
    /// Directory with a package marker file
    Package,
    /// Directory without a marker, accepted as an implicit package
    Namespace,
}

impl UnitKind {
    pub fn is_package(self) -> bool {
        matches!(self, Self::Package | Self::Namespace)
    }
}

/// Extension and package rules for unit files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLayout {
    /// Source extensions, highest priority first
    pub source_extensions: Vec<String>,
    /// Compiled extensions, consulted after every source extension
    pub compiled_extensions: Vec<String>,
    /// File that marks a directory as a regular package
    pub package_marker: String,
    /// Treat directories without a marker as packages
    pub implicit_packages: bool,
}

impl Default for UnitLayout {
    fn default() -> Self {
        Self {
            source_extensions: vec!["toml".to_string()],
            compiled_extensions: vec![
                "json".to_string(),
                platform::library_extension().to_string(),
            ],
            package_marker: "__init__.toml".to_string(),
            implicit_packages: true,
        }
    }
}

impl UnitLayout {
    /// All recognized extensions in priority order
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.source_extensions
            .iter()
            .chain(self.compiled_extensions.iter())
            .map(String::as_str)
    }

    /// Kind of unit a file with extension `ext` holds
    pub fn kind_for_extension(&self, ext: &str) -> Option<UnitKind> {
        if self.source_extensions.iter().any(|e| e == ext) {
            Some(UnitKind::Source)
        } else if ext == platform::library_extension() {
            self.compiled_extensions
                .iter()
                .any(|e| e == ext)
                .then_some(UnitKind::Native)
        } else if self.compiled_extensions.iter().any(|e| e == ext) {
            Some(UnitKind::Compiled)
        } else {
            None
        }
    }

    /// Classify a unit file
    ///
    /// A file is a unit when its stem is an identifier and its extension is
    /// recognized. A file is shadowed, and rejected, when a sibling with the
    /// same stem and a higher-priority extension exists, so a compiled
    /// artifact only counts when its source is absent.
    pub fn module_kind(&self, path: &Path) -> Option<UnitKind> {
        if !path.is_file() {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        if !is_identifier(stem) {
            return None;
        }
        let kind = self.kind_for_extension(ext)?;

        let shadowed = self
            .extensions()
            .take_while(|e| *e != ext)
            .any(|e| path.with_extension(e).is_file());
        (!shadowed).then_some(kind)
    }

    /// Classify a package directory
    pub fn package_kind(&self, path: &Path) -> Option<UnitKind> {
        if !path.is_dir() {
            return None;
        }
        let name = path.file_name()?.to_str()?;
        if !is_identifier(name) {
            return None;
        }
        if self.marker_path(path).is_file() {
            Some(UnitKind::Package)
        } else if self.implicit_packages {
            Some(UnitKind::Namespace)
        } else {
            None
        }
    }

    /// Classify any filesystem entry
    pub fn unit_kind(&self, path: &Path) -> Option<UnitKind> {
        self.module_kind(path).or_else(|| self.package_kind(path))
    }

    /// Whether the entry is a loadable module or package
    pub fn is_importable(&self, path: &Path) -> bool {
        self.unit_kind(path).is_some()
    }

    /// Package marker file inside `dir`
    pub fn marker_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.package_marker)
    }
}

/// Local name an entry contributes to a qualified name
pub fn unit_stem(path: &Path) -> Option<&str> {
    path.file_stem()?.to_str()
}
