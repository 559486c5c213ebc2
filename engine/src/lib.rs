//! Scout Engine Library
//!
//! This library provides discovery and resolution of code units at runtime.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Unit enumeration, filtering and symbol discovery
pub mod discovery;

/// Spec string resolution
pub mod resolver;

/// Runtime module for loading code units
pub mod runtime;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

/// Platform-specific utilities module
pub mod platform;
