//! Selector errors.

use thiserror::Error;

/// Why a pattern could not be compiled or evaluated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Invalid RULE pattern '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },

    #[error("Invalid PATH pattern '{pattern}': {reason}")]
    InvalidPath { pattern: String, reason: String },

    #[error("PATH pattern '{0}' does not select nodes")]
    NotANodeSet(String),
}

impl SelectorError {
    pub(crate) fn rule(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn path(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SelectorError::rule("a[", "unclosed bracket");
        assert_eq!(err.to_string(), "Invalid RULE pattern 'a[': unclosed bracket");

        let err = SelectorError::path("//bad[", "unexpected end");
        assert_eq!(err.to_string(), "Invalid PATH pattern '//bad[': unexpected end");

        let err = SelectorError::NotANodeSet("1 + 1".to_string());
        assert!(err.to_string().contains("does not select nodes"));
    }
}
