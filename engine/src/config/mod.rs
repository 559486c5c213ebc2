//! Configuration management
//!
//! This module handles loading, validation, and management of the Scout configuration.
//! Configuration is stored in TOML format at ~/.scout/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **discovery**: Search paths, enumeration strategy and unit file layout
//! - **resolver**: Module path aliases
//!
//! # Path Expansion
//!
//! Search paths starting with `~` are expanded to the user's home directory.
//! Paths are not canonicalized; a search path that does not exist simply
//! provides no units.
//!
//! # Examples
//!
//! ```no_run
//! use scout_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! // Access configuration values
//! println!("Search paths: {:?}", config.discovery.search_paths);
//! println!("Strategy: {:?}", config.discovery.strategy);
//! # Ok(())
//! # }
//! ```

use crate::discovery::{Strategy, UnitLayout};
use crate::platform;
use crate::resolver::Translation;
use sdk::errors::EngineError;
use sdk::helpers::is_identifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Every section is optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Unit discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Spec string resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Unit discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Extra loader search paths (supports ~ expansion)
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Enumeration strategy (auto, walk, fallback)
    #[serde(default)]
    pub strategy: Strategy,

    /// Treat directories without a package marker as packages
    #[serde(default = "default_true")]
    pub implicit_packages: bool,

    /// File that marks a directory as a regular package
    #[serde(default = "default_package_marker")]
    pub package_marker: String,

    /// Source unit extensions, highest priority first
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Compiled unit extensions, consulted after the source extensions
    #[serde(default = "default_compiled_extensions")]
    pub compiled_extensions: Vec<String>,
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Module path segment aliases
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_package_marker() -> String {
    "__init__.toml".to_string()
}

fn default_source_extensions() -> Vec<String> {
    vec!["toml".to_string()]
}

fn default_compiled_extensions() -> Vec<String> {
    vec!["json".to_string(), platform::library_extension().to_string()]
}

fn default_aliases() -> BTreeMap<String, String> {
    Translation::default().aliases().clone()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            strategy: Strategy::default(),
            implicit_packages: true,
            package_marker: default_package_marker(),
            source_extensions: default_source_extensions(),
            compiled_extensions: default_compiled_extensions(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
        }
    }
}

impl DiscoveryConfig {
    /// Unit file layout described by this section
    pub fn layout(&self) -> UnitLayout {
        UnitLayout {
            source_extensions: self.source_extensions.clone(),
            compiled_extensions: self.compiled_extensions.clone(),
            package_marker: self.package_marker.clone(),
            implicit_packages: self.implicit_packages,
        }
    }
}

impl ResolverConfig {
    /// Alias table described by this section
    pub fn translation(&self) -> Translation {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

impl Config {
    /// Load configuration from ~/.scout/config.toml or create default if not exists
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The home directory cannot be determined
    /// - The config file cannot be read, parsed or written
    /// - The configuration fails validation
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        // Validate and process configuration
        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration file
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        // Serialize to TOML
        let toml_string = config.to_toml()?;

        // Write to file
        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the default configuration file path (~/.scout/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".scout").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level
    /// - Validates extensions, the package marker and aliases
    /// - Expands ~ in search paths
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        // Validate extensions
        let discovery = &self.discovery;
        if discovery.source_extensions.is_empty() && discovery.compiled_extensions.is_empty() {
            return Err(EngineError::Config(
                "At least one unit extension must be configured".to_string(),
            ));
        }
        for ext in discovery
            .source_extensions
            .iter()
            .chain(discovery.compiled_extensions.iter())
        {
            if ext.is_empty() || ext.starts_with('.') {
                return Err(EngineError::Config(format!(
                    "Invalid extension '{}'. Extensions are given without a leading dot",
                    ext
                )));
            }
        }

        // Validate package marker
        if discovery.package_marker.is_empty() {
            return Err(EngineError::Config(
                "package_marker must not be empty".to_string(),
            ));
        }

        // Validate aliases
        for (alias, canonical) in &self.resolver.aliases {
            if !is_identifier(alias) || !is_identifier(canonical) {
                return Err(EngineError::Config(format!(
                    "Invalid alias '{}' = '{}'. Both sides must be identifiers",
                    alias, canonical
                )));
            }
        }

        // Expand search paths
        self.discovery.search_paths = self
            .discovery
            .search_paths
            .iter()
            .map(|p| expand_path(p))
            .collect::<Result<_, _>>()?;

        Ok(())
    }
}

/// Expand ~ to the user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.discovery.strategy, Strategy::Auto);
        assert!(config.discovery.implicit_packages);
        assert_eq!(config.resolver.aliases.get("np").map(String::as_str), Some("numpy"));
        assert_eq!(config.discovery.layout(), UnitLayout::default());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_expand_path_tilde_only() {
        let path = PathBuf::from("~");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = config.to_toml().unwrap();

        // Verify it can be deserialized back
        let deserialized = Config::parse(&toml_string).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_translation_from_aliases() {
        let config = Config::parse("[resolver.aliases]\npd = \"pandas\"\n").unwrap();
        let translation = config.resolver.translation();
        assert_eq!(translation.translate("pd"), "pandas");
        assert_eq!(translation.translate("np"), "np");
    }
}
