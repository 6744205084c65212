//! Declarative element selectors.

use serde::{Deserialize, Serialize};

/// Which selector dialect a pattern is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Addressing {
    /// Path-query language evaluated against the document tree.
    Path,
    /// Structural rule (stylesheet-style) selector.
    Rule,
}

/// Slice applied to the ordered match list.
///
/// `from` is inclusive and defaults to 0; an absent `to` means "until the end".
/// Both are interpreted against the full, unsliced match list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
}

impl Range {
    pub fn from(from: i64) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn between(from: i64, to: i64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }
}

/// One declarative selector: addressing scheme, pattern and optional range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Selector {
    pub addressing: Addressing,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl Selector {
    /// Rule-addressed selector, e.g. `Selector::rule(".item")`.
    pub fn rule(pattern: impl Into<String>) -> Self {
        Self {
            addressing: Addressing::Rule,
            pattern: pattern.into(),
            range: None,
        }
    }

    /// Path-addressed selector, e.g. `Selector::path("//li")`.
    pub fn path(pattern: impl Into<String>) -> Self {
        Self {
            addressing: Addressing::Path,
            pattern: pattern.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_wire_format() {
        let selector = Selector::rule(".item").with_range(Range::between(1, 3));
        let value = serde_json::to_value(&selector).unwrap();
        assert_eq!(
            value,
            json!({"addressing": "RULE", "pattern": ".item", "range": {"from": 1, "to": 3}})
        );
    }

    #[test]
    fn test_selector_empty_range() {
        let selector: Selector =
            serde_json::from_value(json!({"addressing": "PATH", "pattern": "//bad[", "range": {}}))
                .unwrap();
        assert_eq!(selector.addressing, Addressing::Path);
        assert_eq!(selector.range, Some(Range::default()));
    }

    #[test]
    fn test_selector_rejects_unknown_fields() {
        let result: Result<Selector, _> = serde_json::from_value(
            json!({"addressing": "RULE", "pattern": "a", "extra": true}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_selector_rejects_unknown_addressing() {
        let result: Result<Selector, _> =
            serde_json::from_value(json!({"addressing": "XPATH", "pattern": "a"}));
        assert!(result.is_err());
    }
}
