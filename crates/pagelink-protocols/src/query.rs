//! Queries and query maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::selector::Selector;

/// Allow-list sentinel: include the element's descendant text.
pub const ATTR_TEXT: &str = "text";
/// Allow-list sentinel: include non-empty inline style properties.
pub const ATTR_STYLE: &str = "style";
/// Allow-list sentinel: include the element's node name.
pub const ATTR_NODE: &str = "node";
/// Allow-list sentinel: include every declared attribute.
pub const ATTR_ALL: &str = "*";

/// A selector plus what to extract from each matched element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Query {
    pub selector: Selector,
    /// `None` extracts everything; otherwise an allow-list that may contain
    /// the `text`, `style`, `node` and `*` sentinels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<String>>,
    /// Named child queries evaluated relative to each matched element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, Query>>,
}

/// Named bundle of independent queries evaluated and reported together.
pub type QueryMap = BTreeMap<String, Query>;

impl Query {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            attrs: None,
            children: None,
        }
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: Query) -> Self {
        self.children
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), child);
        self
    }

    /// Whether `name` passes the attribute allow-list.
    pub fn wants_attribute(&self, name: &str) -> bool {
        match &self.attrs {
            None => true,
            Some(list) => list.iter().any(|a| a == name || a == ATTR_ALL),
        }
    }

    /// Whether the sentinel key (`text`, `style`, `node`) was requested.
    pub fn wants_sentinel(&self, sentinel: &str) -> bool {
        match &self.attrs {
            None => true,
            Some(list) => list.iter().any(|a| a == sentinel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_filter_unset_wants_everything() {
        let query = Query::new(Selector::rule("a"));
        assert!(query.wants_attribute("href"));
        assert!(query.wants_sentinel(ATTR_TEXT));
        assert!(query.wants_sentinel(ATTR_NODE));
    }

    #[test]
    fn test_query_filter_star_covers_attributes_only() {
        let query = Query::new(Selector::rule("a")).with_attrs(["*"]);
        assert!(query.wants_attribute("href"));
        assert!(!query.wants_sentinel(ATTR_TEXT));
        assert!(!query.wants_sentinel(ATTR_STYLE));
    }

    #[test]
    fn test_query_nested_children_roundtrip() {
        let value = json!({
            "selector": {"addressing": "RULE", "pattern": "ul"},
            "attrs": ["text"],
            "children": {
                "items": {"selector": {"addressing": "RULE", "pattern": "li"}}
            }
        });
        let query: Query = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(query.children.as_ref().unwrap().len(), 1);
        assert_eq!(serde_json::to_value(&query).unwrap(), value);
    }
}
