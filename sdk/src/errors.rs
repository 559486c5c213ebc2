//! Error types and handling
//!
//! This module provides the error types used throughout Scout.
//! All errors implement the `ScoutErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Recoverable here means a discovery scan can record the failure and move on
//! to the next candidate. The resolver treats every error as fatal regardless,
//! since it has exactly one target to produce.

use std::path::PathBuf;
use thiserror::Error;

/// Trait for Scout error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ScoutErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors only affect one candidate unit or symbol. Non-recoverable
    /// errors mean the environment itself is unusable (bad config, broken library).
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Loading**: A unit could not be located or failed while loading
/// - **Attributes**: A symbol or dotted attribute path could not be read
/// - **Types**: A subclass check could not be evaluated
/// - **Enumeration**: The primary walking facility is unavailable or failed
/// - **Native**: Shared library loading failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ScoutErrorExt};
///
/// let error = EngineError::UnitNotFound("plugins.shapes".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("bad log level".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Loading errors
    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Failed to load unit '{unit}': {reason}")]
    UnitLoadFailed { unit: String, reason: String },

    #[error("Invalid unit definition in {path:?}: {reason}")]
    InvalidUnit { path: PathBuf, reason: String },

    #[error("Circular load of unit '{0}'")]
    CircularLoad(String),

    // Attribute errors
    #[error("'{owner}' has no attribute '{name}'")]
    AttributeNotFound { owner: String, name: String },

    #[error("Invalid spec string '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    // Type relationship errors
    #[error("Not a type: {0}")]
    NotAType(String),

    #[error("Type hierarchy of '{0}' exceeds the maximum depth")]
    TypeHierarchyTooDeep(String),

    // Enumeration errors
    #[error("Unit walking not supported: {0}")]
    WalkUnsupported(String),

    #[error("Enumeration failed for {path:?}: {reason}")]
    Enumeration { path: PathBuf, reason: String },

    // Library loading errors
    #[error("Library load failed: {0}")]
    LibraryLoadFailed(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Wrap any displayable failure as a load failure of `unit`
    pub fn load_failed(unit: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::UnitLoadFailed {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an attribute lookup failure
    pub fn attribute(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl ScoutErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::UnitNotFound(_) => "Check the unit name and the configured search paths",
            Self::UnitLoadFailed { .. } => "The unit failed while loading. Check its definition",
            Self::InvalidUnit { .. } => "The unit file is malformed. Fix it and retry",
            Self::CircularLoad(_) => "Units reference each other in a loop. Break the cycle",

            Self::AttributeNotFound { .. } => "The requested attribute does not exist",
            Self::InvalidSpec { .. } => "Use the form 'module.path[:item.path]'",

            Self::NotAType(_) => "Subclass checks need a type as the base",
            Self::TypeHierarchyTooDeep(_) => "The type hierarchy is too deep to inspect",

            Self::WalkUnsupported(_) => "Falling back to a directory scan",
            Self::Enumeration { .. } => "A directory could not be scanned. Check permissions",

            Self::LibraryLoadFailed(_) => "Failed to load a native unit library",
            Self::SymbolNotFound(_) => "Native unit library is incompatible",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::LibraryLoadFailed(_) | Self::SymbolNotFound(_) => false,

            // All other errors only affect a single candidate
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failed_display() {
        let err = EngineError::load_failed("pkg.broken", "bad toml");
        assert_eq!(err.to_string(), "Failed to load unit 'pkg.broken': bad toml");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_attribute_display() {
        let err = EngineError::attribute("pkg.sub", "Missing");
        assert_eq!(err.to_string(), "'pkg.sub' has no attribute 'Missing'");
    }

    #[test]
    fn test_native_errors_not_recoverable() {
        assert!(!EngineError::LibraryLoadFailed("x".into()).is_recoverable());
        assert!(!EngineError::SymbolNotFound("x".into()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert_eq!(err.user_hint(), "File system operation failed");
    }
}
