//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - list: Enumerate candidate unit names
//! - find: Load candidates and print accepted symbols
//! - resolve: Resolve one spec string
//! - compile: Write the JSON form of a TOML unit file
//! - config show / validate

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discovery::condition::accept_public_path;
use crate::discovery::{
    Condition, Discovery, IsSubclass, ScanFailure, Strategy, UnitLayout,
};
use crate::resolver::{Resolver, Translation};
use crate::runtime::FileSystemLoader;
use sdk::errors::ScoutErrorExt;
use sdk::helpers::is_public;
use sdk::manifest::UnitManifest;
use sdk::types::{Symbol, Value};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Filter built from command-line flags
struct CliFilter {
    include_private: bool,
    subclass: Option<IsSubclass>,
}

impl Condition for CliFilter {
    fn accept_path(&self, name: &str, path: &Path, layout: &UnitLayout) -> bool {
        if self.include_private {
            layout.is_importable(path)
        } else {
            accept_public_path(name, path, layout)
        }
    }

    fn accept_symbol(&self, unit: &str, name: &str, value: &Value) -> bool {
        match &self.subclass {
            Some(subclass) if self.include_private => value
                .as_type()
                .and_then(|ty| ty.is_subclass_of(subclass.base()).ok())
                .unwrap_or(false),
            Some(subclass) => subclass.accept_symbol(unit, name, value),
            None => self.include_private || is_public(name),
        }
    }
}

/// Directory a root contributes to, a file root meaning its directory
fn root_directory(root: &Path) -> PathBuf {
    if root.is_file() {
        root.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        root.to_path_buf()
    }
}

/// Absolute form of a root, so `.` and other relative roots can be climbed
fn absolute_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(root))
            .unwrap_or_else(|_| root.to_path_buf())
            .components()
            .collect()
    })
}

/// Loader search path for a root scanned with `prefix`
///
/// With prefix `a.b.` the root is the `a/b` directory, so units are found
/// two levels up. Climbing stops at the filesystem root.
pub fn search_root(root: &Path, prefix: &str) -> PathBuf {
    let depth = prefix.split('.').filter(|s| !s.is_empty()).count();
    let mut dir = root_directory(&absolute_root(root));
    for _ in 0..depth {
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
    dir
}

/// Filesystem loader for the given roots plus the configured search paths
fn build_loader(config: &Config, extra_paths: Vec<PathBuf>) -> FileSystemLoader {
    let mut search_paths: Vec<PathBuf> = Vec::new();
    for path in extra_paths
        .into_iter()
        .chain(config.discovery.search_paths.iter().cloned())
    {
        if !search_paths.contains(&path) {
            search_paths.push(path);
        }
    }
    tracing::debug!("Loader search paths: {:?}", search_paths);
    FileSystemLoader::new(search_paths, config.discovery.layout())
}

fn strategy_for(config: &Config, fallback: bool, include_private: bool) -> Strategy {
    // The loader walk never yields private names
    if fallback || include_private {
        Strategy::Fallback
    } else {
        config.discovery.strategy
    }
}

fn failure_json(failure: &ScanFailure) -> serde_json::Value {
    serde_json::to_value(failure).unwrap_or_else(|_| json!({ "message": failure.to_string() }))
}

fn print_failures(failures: &[ScanFailure]) {
    if failures.is_empty() {
        return;
    }
    println!();
    println!("Failures ({}):", failures.len());
    for failure in failures {
        println!("  ✗ {}", failure);
    }
}

/// List candidate unit names
pub fn handle_list(
    roots: Vec<PathBuf>,
    prefix: String,
    fallback: bool,
    include_private: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let search_paths = roots.iter().map(|r| search_root(r, &prefix)).collect();
    let loader = build_loader(config, search_paths);
    let filter = CliFilter {
        include_private,
        subclass: None,
    };

    let discovery = Discovery::new(&loader)
        .with_layout(config.discovery.layout())
        .with_strategy(strategy_for(config, fallback, include_private));
    let mut names = discovery.enumerate(roots, &filter, &prefix);
    let units: Vec<String> = names.by_ref().collect();
    let failures = names.take_failures();

    match format {
        OutputFormat::Text => {
            if units.is_empty() {
                println!("No units found");
            }
            for unit in &units {
                println!("{}", unit);
            }
            print_failures(&failures);
        }
        OutputFormat::Json => {
            let output = json!({
                "units": units,
                "fallback": names.used_fallback(),
                "failures": failures.iter().map(failure_json).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn symbol_json(symbol: &Symbol) -> serde_json::Value {
    json!({
        "unit": symbol.unit,
        "name": symbol.name,
        "kind": symbol.value.kind(),
        "value": symbol.value.to_json(),
    })
}

/// Find symbols in the units under the given roots
pub fn handle_find(
    roots: Vec<PathBuf>,
    prefix: String,
    subclass_of: Option<String>,
    include_private: bool,
    fallback: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let search_paths = roots.iter().map(|r| search_root(r, &prefix)).collect();
    let loader = build_loader(config, search_paths);

    let subclass = match subclass_of {
        Some(spec) => {
            let base = Resolver::new(&loader)
                .with_translation(config.resolver.translation())
                .resolve(&spec)
                .with_context(|| format!("Failed to resolve base type '{}'", spec))?;
            if base.as_type().is_none() {
                bail!("'{}' is a {}, not a type", spec, base.kind());
            }
            Some(IsSubclass::new(base))
        }
        None => None,
    };
    let filter = CliFilter {
        include_private,
        subclass,
    };

    let discovery = Discovery::new(&loader)
        .with_layout(config.discovery.layout())
        .with_strategy(strategy_for(config, fallback, include_private));
    let report = discovery.find(roots, &filter, &prefix).into_report();

    match format {
        OutputFormat::Text => {
            if report.symbols.is_empty() {
                if report.is_complete() {
                    println!("No matching symbols");
                } else {
                    println!("No matching symbols (scan incomplete)");
                }
            }
            for symbol in &report.symbols {
                println!(
                    "{}.{} ({}) = {}",
                    symbol.unit,
                    symbol.name,
                    symbol.value.kind(),
                    symbol.value.describe()
                );
            }
            println!();
            println!(
                "{} symbols from {} units",
                report.symbols.len(),
                report.units_loaded
            );
            print_failures(&report.failures);
        }
        OutputFormat::Json => {
            let output = json!({
                "symbols": report.symbols.iter().map(symbol_json).collect::<Vec<_>>(),
                "units_loaded": report.units_loaded,
                "complete": report.is_complete(),
                "failures": report.failures.iter().map(failure_json).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Parse `ALIAS=NAME` pairs on top of the configured aliases
fn translation_with(config: &Config, aliases: &[String]) -> Result<Translation> {
    let mut translation = config.resolver.translation();
    for pair in aliases {
        let Some((alias, name)) = pair.split_once('=') else {
            bail!("Invalid alias '{}'. Use ALIAS=NAME", pair);
        };
        translation = translation.with_alias(alias.trim(), name.trim());
    }
    Ok(translation)
}

/// Resolve one spec string
pub fn handle_resolve(
    spec: String,
    paths: Vec<PathBuf>,
    aliases: Vec<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let paths = if paths.is_empty() && config.discovery.search_paths.is_empty() {
        vec![std::env::current_dir().context("Failed to read current directory")?]
    } else {
        paths
    };
    let loader = build_loader(config, paths);
    let translation = translation_with(config, &aliases)?;

    let value = match Resolver::new(&loader)
        .with_translation(translation)
        .resolve(&spec)
    {
        Ok(value) => value,
        Err(e) => {
            let hint = e.user_hint().to_string();
            return Err(anyhow::Error::new(e).context(format!("Failed to resolve '{}' ({})", spec, hint)));
        }
    };

    match format {
        OutputFormat::Text => {
            println!("{} ({})", value.describe(), value.kind());
        }
        OutputFormat::Json => {
            let output = json!({
                "spec": spec,
                "kind": value.kind(),
                "value": value.to_json(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Compile a TOML unit file into the JSON form next to it
///
/// Returns the path of the written file.
pub fn compile_unit(file: &Path) -> Result<PathBuf> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let manifest = UnitManifest::from_toml(&source)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    manifest
        .validate()
        .and_then(|_| manifest.type_order().map(|_| ()))
        .map_err(|reason| anyhow::anyhow!("Invalid unit {}: {}", file.display(), reason))?;

    let output = file.with_extension("json");
    std::fs::write(&output, manifest.to_json()?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}

/// Compile a unit file
pub fn handle_compile(file: PathBuf, format: OutputFormat) -> Result<()> {
    let output = compile_unit(&file)?;

    match format {
        OutputFormat::Text => {
            println!("✓ Compiled {} -> {}", file.display(), output.display());
        }
        OutputFormat::Json => {
            let output = json!({
                "source": file,
                "compiled": output,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Validate a configuration file
pub fn handle_config_validate(path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    let result = Config::load_from_path(&path);

    match format {
        OutputFormat::Text => match &result {
            Ok(_) => println!("✓ {} is valid", path.display()),
            Err(e) => println!("✗ {}: {}\n  Hint: {}", path.display(), e, e.user_hint()),
        },
        OutputFormat::Json => {
            let output = json!({
                "path": path,
                "valid": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    result.map(|_| ()).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_search_root_climbs_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let nested = base.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(search_root(&nested, "a.b."), base);
        assert_eq!(search_root(&nested, "a.b"), base);
        assert_eq!(search_root(&nested, ""), nested);

        let file = nested.join("unit.toml");
        fs::write(&file, "").unwrap();
        assert_eq!(search_root(&file, "a.b."), base);
    }

    #[test]
    fn test_search_root_of_current_directory() {
        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
        let parent = cwd.parent().unwrap().to_path_buf();

        assert_eq!(search_root(Path::new("."), "plugins."), parent);
        assert_eq!(search_root(Path::new("."), ""), cwd);
        assert_eq!(search_root(Path::new("./"), "plugins"), parent);
    }

    #[test]
    #[cfg(unix)]
    fn test_search_root_stops_at_filesystem_root() {
        let top = Path::new("/");
        assert_eq!(search_root(top, "a.b.c."), top);
    }

    #[test]
    fn test_search_root_of_missing_relative_root() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            search_root(Path::new("./not-created/plugins"), "plugins."),
            cwd.join("not-created")
        );
    }

    #[test]
    fn test_translation_with_overrides() {
        let config = Config::default();
        let translation = translation_with(&config, &["pd=pandas".to_string()]).unwrap();
        assert_eq!(translation.translate("pd"), "pandas");
        assert_eq!(translation.translate("np"), "numpy");
        assert!(translation_with(&config, &["broken".to_string()]).is_err());
    }

    #[test]
    fn test_cli_filter_private() {
        let strict = CliFilter {
            include_private: false,
            subclass: None,
        };
        let loose = CliFilter {
            include_private: true,
            subclass: None,
        };
        assert!(!strict.accept_symbol("m", "_x", &Value::data(1)));
        assert!(loose.accept_symbol("m", "_x", &Value::data(1)));
    }

    #[test]
    fn test_compile_unit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("shapes.toml");
        fs::write(&file, "[types.Shape]\n[types.Circle]\nbases = [\"Shape\"]\n").unwrap();

        let output = compile_unit(&file).unwrap();
        assert_eq!(output, dir.path().join("shapes.json"));
        let compiled = UnitManifest::from_json(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(compiled.types["Circle"].bases, vec!["Shape"]);
    }

    #[test]
    fn test_compile_rejects_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cyc.toml");
        fs::write(&file, "[types.A]\nbases = [\"A\"]\n").unwrap();
        assert!(compile_unit(&file).is_err());
        assert!(!dir.path().join("cyc.json").exists());
    }
}
