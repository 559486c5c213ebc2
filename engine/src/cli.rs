//! CLI interface for Scout
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scout code unit discovery
///
/// Scans directories for code units, finds the symbols they define, and
/// resolves single symbols from `module.path:item.path` spec strings.
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List candidate unit names under the given roots
    List {
        /// Directories (or files, meaning their directory) to scan
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Dotted package the roots live in
        #[arg(long, default_value = "")]
        prefix: String,

        /// Skip the loader walk and scan directories directly
        #[arg(long)]
        fallback: bool,

        /// Also list units whose names start with an underscore
        #[arg(long)]
        include_private: bool,
    },

    /// Load the units under the given roots and print their symbols
    Find {
        /// Directories (or files, meaning their directory) to scan
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Dotted package the roots live in
        #[arg(long, default_value = "")]
        prefix: String,

        /// Only report types deriving from this spec string's type
        #[arg(long, value_name = "SPEC")]
        subclass_of: Option<String>,

        /// Also report units and symbols whose names start with an underscore
        #[arg(long)]
        include_private: bool,

        /// Skip the loader walk and scan directories directly
        #[arg(long)]
        fallback: bool,
    },

    /// Resolve one symbol from a `module.path[:item.path]` spec string
    Resolve {
        /// The spec string
        spec: String,

        /// Extra search path (repeatable)
        #[arg(long = "path", value_name = "DIR")]
        paths: Vec<PathBuf>,

        /// Module segment alias as ALIAS=NAME (repeatable)
        #[arg(long = "alias", value_name = "ALIAS=NAME")]
        aliases: Vec<String>,
    },

    /// Compile a TOML unit file into its JSON form
    Compile {
        /// The unit file to compile
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate the configuration file
    Validate,
}
