//! Helper utilities for dotted unit names

use regex::Regex;
use std::sync::OnceLock;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

/// Whether `name` is a valid name segment (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier pattern"))
        .is_match(name)
}

/// Final segment of a dotted name
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Names whose final segment starts with an underscore are private
pub fn is_public(name: &str) -> bool {
    !last_segment(name).starts_with('_')
}

/// Whether every segment of a dotted name is an identifier
pub fn is_dotted_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("shapes"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("Circle2"));
        assert!(!is_identifier("2d"));
        assert!(!is_identifier(".git"));
        assert!(!is_identifier("my-unit"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_is_public() {
        assert!(is_public("pkg.shapes"));
        assert!(!is_public("pkg._shapes"));
        assert!(is_public("_pkg.shapes"));
        assert!(!is_public("__init__"));
    }

    #[test]
    fn test_is_dotted_name() {
        assert!(is_dotted_name("numpy.random"));
        assert!(!is_dotted_name("numpy..random"));
        assert!(!is_dotted_name(""));
    }
}
