//! Scout SDK
//!
//! Shared library providing traits, types, and utilities for Scout components.
//! This crate is used by both the engine and by authors of native units.

/// Code unit trait and module type
pub mod unit;

/// Error types and handling
pub mod errors;

/// Symbol value types
pub mod types;

/// Unit file format
pub mod manifest;

/// Helper utilities
pub mod helpers;

// Re-export commonly used types
pub use errors::{EngineError, ScoutErrorExt};
pub use manifest::{BaseRef, TypeEntry, UnitManifest};
pub use types::{Symbol, TypeInfo, Value};
pub use unit::{CodeUnit, Module};
