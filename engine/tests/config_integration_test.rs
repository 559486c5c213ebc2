//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be properly loaded,
//! validated, and turned into the layout and alias table discovery uses.

use scout_engine::config::Config;
use scout_engine::discovery::Strategy;
use sdk::errors::EngineError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_toml_parsing() {
    let file = write_config(
        r#"
[core]
log_level = "debug"

[discovery]
search_paths = ["/srv/units"]
strategy = "fallback"
implicit_packages = false
package_marker = "package.toml"
source_extensions = ["toml", "unit"]
compiled_extensions = ["json"]

[resolver.aliases]
pd = "pandas"
"#,
    );

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.discovery.search_paths, vec![PathBuf::from("/srv/units")]);
    assert_eq!(config.discovery.strategy, Strategy::Fallback);

    let layout = config.discovery.layout();
    assert!(!layout.implicit_packages);
    assert_eq!(layout.package_marker, "package.toml");
    assert_eq!(layout.extensions().collect::<Vec<_>>(), vec!["toml", "unit", "json"]);

    // An explicit alias table replaces the default one
    let translation = config.resolver.translation();
    assert_eq!(translation.translate("pd"), "pandas");
    assert_eq!(translation.translate("np"), "np");
}

#[test]
fn test_missing_sections_use_defaults() {
    let file = write_config("[core]\nlog_level = \"warn\"\n");
    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "warn");
    assert_eq!(config.discovery.strategy, Strategy::Auto);
    assert!(config.discovery.implicit_packages);
    assert_eq!(config.resolver.translation().translate("np"), "numpy");
}

#[test]
fn test_invalid_log_level_rejected() {
    let file = write_config("[core]\nlog_level = \"loud\"\n");
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, EngineError::Config(ref msg) if msg.contains("Invalid log level")));
}

#[test]
fn test_extension_with_leading_dot_rejected() {
    let file = write_config("[discovery]\nsource_extensions = [\".toml\"]\n");
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("leading dot"));
}

#[test]
fn test_alias_must_be_identifier() {
    let file = write_config("[resolver.aliases]\n\"n-p\" = \"numpy\"\n");
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid alias"));
}

#[test]
fn test_unknown_strategy_rejected() {
    let file = write_config("[discovery]\nstrategy = \"guess\"\n");
    assert!(matches!(
        Config::load_from_path(file.path()),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_search_paths_tilde_expansion() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let file = write_config("[discovery]\nsearch_paths = [\"~/units\", \"relative\"]\n");
    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(
        config.discovery.search_paths,
        vec![home.join("units"), PathBuf::from("relative")]
    );
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_rendered_config_parses_back() {
    let config = Config::default();
    let rendered = config.to_toml().unwrap();
    let parsed = Config::parse(&rendered).unwrap();
    assert_eq!(parsed.discovery.layout(), config.discovery.layout());
    assert_eq!(parsed.resolver.aliases, config.resolver.aliases);
}
