//! Native unit libraries
//!
//! A compiled native unit is a shared library (.so/.dylib/.dll) exporting the
//! `scout_unit_register` function generated by `sdk::declare_unit!`. Loading
//! one runs that function, which is the library's load-time side effect.
//!
//! The library handle lives exactly as long as the unit it produced: the unit
//! is dropped first, then the library is unloaded.

use sdk::{
    errors::EngineError,
    types::Value,
    unit::{CodeUnit, REGISTER_SYMBOL},
};
use std::path::{Path, PathBuf};

/// A unit produced by a native library, under the name it was loaded as
pub struct NativeUnit {
    name: String,
    origin: PathBuf,
    // Field order matters: the unit's code lives in the library
    unit: Box<dyn CodeUnit>,
    _library: libloading::Library,
}

impl CodeUnit for NativeUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Option<Vec<String>> {
        self.unit.exports()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.unit.attribute_names()
    }

    fn get_attr(&self, name: &str) -> Result<Value, EngineError> {
        self.unit.get_attr(name)
    }

    fn origin(&self) -> Option<&Path> {
        Some(&self.origin)
    }
}

/// Load the native unit library at `path` as unit `name`
///
/// # Errors
///
/// Returns `EngineError::LibraryLoadFailed` if the shared library cannot be
/// loaded or its registration function returns null, and
/// `EngineError::SymbolNotFound` if it does not export `scout_unit_register`.
pub fn load_native_unit(name: &str, path: &Path) -> Result<NativeUnit, EngineError> {
    tracing::debug!("Loading native unit '{}' from {}", name, path.display());

    // Load the shared library
    let library = unsafe {
        libloading::Library::new(path).map_err(|e| {
            tracing::error!("Failed to load library {}: {}", path.display(), e);
            EngineError::LibraryLoadFailed(e.to_string())
        })?
    };

    let unit = {
        let register: libloading::Symbol<unsafe extern "C" fn() -> *mut dyn CodeUnit> = unsafe {
            library.get(REGISTER_SYMBOL).map_err(|e| {
                tracing::error!(
                    "Symbol 'scout_unit_register' not found in {}: {}",
                    path.display(),
                    e
                );
                EngineError::SymbolNotFound(e.to_string())
            })?
        };

        unsafe {
            let ptr = register();
            if ptr.is_null() {
                tracing::error!("scout_unit_register returned null for '{}'", name);
                return Err(EngineError::LibraryLoadFailed(
                    "scout_unit_register returned null".to_string(),
                ));
            }
            Box::from_raw(ptr)
        }
    };

    tracing::debug!("Native unit '{}' registered", name);
    Ok(NativeUnit {
        name: name.to_string(),
        origin: path.to_path_buf(),
        unit,
        _library: library,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform;

    #[test]
    fn test_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(platform::native_unit_filename("absent"));
        let result = load_native_unit("absent", &path);
        assert!(matches!(result, Err(EngineError::LibraryLoadFailed(_))));
    }

    #[test]
    fn test_garbage_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(platform::native_unit_filename("garbage"));
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let result = load_native_unit("garbage", &path);
        assert!(matches!(result, Err(EngineError::LibraryLoadFailed(_))));
    }
}
