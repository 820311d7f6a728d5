//! Validation for view names arriving from untrusted surfaces (URLs, CLI).
//!
//! Names are slash-separated keys such as `home` or `errors/not_found`. They
//! are used verbatim as registry and database keys, so literal relative
//! segments are rejected here. The remote backend percent-encodes each
//! segment when it builds a URL.

use super::error::DomainError;

/// Check that `raw` is usable as a view name and return it with surrounding
/// slashes removed.
pub fn normalize_view_name(raw: &str) -> Result<&str, DomainError> {
    let name = raw.trim().trim_matches('/');
    if name.is_empty() {
        return Err(DomainError::EmptyViewName);
    }

    if name.contains('\\') {
        return Err(DomainError::invalid_view_name(name, "backslashes are not allowed"));
    }

    for segment in name.split('/') {
        match segment {
            "" => return Err(DomainError::invalid_view_name(name, "empty path segment")),
            "." | ".." => {
                return Err(DomainError::invalid_view_name(
                    name,
                    "relative path segments are not allowed",
                ));
            }
            _ if segment.chars().any(char::is_control) => {
                return Err(DomainError::invalid_view_name(
                    name,
                    "control characters are not allowed",
                ));
            }
            _ => {}
        }
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_surrounding_slashes() {
        assert_eq!(normalize_view_name("/home/").expect("valid"), "home");
        assert_eq!(
            normalize_view_name("errors/not_found").expect("valid"),
            "errors/not_found"
        );
    }

    #[test]
    fn rejects_empty_names() {
        assert!(matches!(
            normalize_view_name("  "),
            Err(DomainError::EmptyViewName)
        ));
        assert!(matches!(
            normalize_view_name("//"),
            Err(DomainError::EmptyViewName)
        ));
    }

    #[test]
    fn rejects_traversal_and_odd_segments() {
        for raw in ["../secrets", "a/../b", "a//b", "a/./b", "a\\b", "a/\u{7}"] {
            assert!(
                matches!(
                    normalize_view_name(raw),
                    Err(DomainError::InvalidViewName { .. })
                ),
                "`{raw}` should be rejected"
            );
        }
    }
}
