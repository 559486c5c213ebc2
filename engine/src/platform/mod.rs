//! Platform-specific utilities
//!
//! Native units are shared libraries, so the file extension a loader looks
//! for depends on the target OS.

/// Get the platform name as a string
///
/// Returns one of: "linux", "macos", "windows", "unknown"
///
/// # Examples
///
/// ```
/// use scout_engine::platform::platform_name;
///
/// let name = platform_name();
/// assert!(["linux", "macos", "windows", "unknown"].contains(&name));
/// ```
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "linux")]
    return "linux";

    #[cfg(target_os = "macos")]
    return "macos";

    #[cfg(target_os = "windows")]
    return "windows";

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "unknown";
}

/// Get the platform-specific shared library extension
///
/// Returns the file extension used for shared libraries on the current platform:
/// - Linux: "so"
/// - macOS: "dylib"
/// - Windows: "dll"
///
/// This is the extension a native unit file carries, and it is part of the
/// default compiled extension list.
///
/// # Examples
///
/// ```
/// use scout_engine::platform::library_extension;
///
/// let ext = library_extension();
///
/// #[cfg(target_os = "linux")]
/// assert_eq!(ext, "so");
///
/// #[cfg(target_os = "macos")]
/// assert_eq!(ext, "dylib");
///
/// #[cfg(target_os = "windows")]
/// assert_eq!(ext, "dll");
/// ```
pub fn library_extension() -> &'static str {
    #[cfg(target_os = "linux")]
    return "so";

    #[cfg(target_os = "macos")]
    return "dylib";

    #[cfg(target_os = "windows")]
    return "dll";

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "so"; // Default to .so for unknown platforms
}

/// File name of a native unit called `stem`
///
/// Unit files are named after the unit, so there is no `lib` prefix.
///
/// # Examples
///
/// ```
/// use scout_engine::platform::native_unit_filename;
///
/// let filename = native_unit_filename("shapes");
///
/// #[cfg(target_os = "linux")]
/// assert_eq!(filename, "shapes.so");
///
/// #[cfg(target_os = "windows")]
/// assert_eq!(filename, "shapes.dll");
/// ```
pub fn native_unit_filename(stem: &str) -> String {
    format!("{}.{}", stem, library_extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name() {
        let name = platform_name();

        #[cfg(target_os = "linux")]
        assert_eq!(name, "linux");

        #[cfg(target_os = "macos")]
        assert_eq!(name, "macos");

        #[cfg(target_os = "windows")]
        assert_eq!(name, "windows");
    }

    #[test]
    fn test_native_unit_filename() {
        let filename = native_unit_filename("shapes");
        assert!(filename.starts_with("shapes."));
        assert!(filename.ends_with(library_extension()));
    }
}
