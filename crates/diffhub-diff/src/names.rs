//! Branch name validation following git-style conventions.
//!
//! Names are checked before they reach a version-control command, so a
//! malformed name is reported as a validation failure rather than as a git
//! error, and can never be mistaken for a command-line option.

use crate::error::{DiffError, Result};

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> DiffError {
    DiffError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// ```
/// use diffhub_diff::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/x").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("--upload-pack").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if name.starts_with('-') {
        return Err(invalid(name, "must not start with '-'"));
    }
    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid(name, "contains a control character"));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") || name == "@" {
        return Err(invalid(name, "must not contain '@{' or be '@'"));
    }
    if name.ends_with('.') || name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.' or '.lock'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["main", "develop", "v1.0", "feature/x", "user/alice/fix-123"] {
            assert!(validate_branch_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn reject_empty_and_blank() {
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("   ").is_err());
    }

    #[test]
    fn reject_option_like() {
        assert!(validate_branch_name("-b").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for name in ["a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b", "has space"] {
            assert!(validate_branch_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn reject_ref_syntax() {
        assert!(validate_branch_name("a..b").is_err());
        assert!(validate_branch_name("ref@{0}").is_err());
        assert!(validate_branch_name("@").is_err());
        assert!(validate_branch_name("main.lock").is_err());
    }

    #[test]
    fn reject_bad_components() {
        assert!(validate_branch_name("/leading").is_err());
        assert!(validate_branch_name("trailing/").is_err());
        assert!(validate_branch_name("a//b").is_err());
        assert!(validate_branch_name("feature/.hidden").is_err());
    }

    #[test]
    fn error_is_validation() {
        let err = validate_branch_name("").unwrap_err();
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }
}
