//! Snapshot evaluation of queries.

use std::collections::BTreeMap;

use pagelink_dom::{Document, NodeId};
use pagelink_protocols::{
    ATTR_NODE, ATTR_STYLE, ATTR_TEXT, Coords, ElementSnapshot, Query, QueryMap, QueryMapResult,
};
use serde_json::{Map, Value};

use crate::resolve::resolve;

/// Evaluate one query, producing a snapshot per matched element.
pub fn evaluate(doc: &Document, query: &Query, parent: Option<NodeId>) -> Vec<ElementSnapshot> {
    resolve(doc, &query.selector, parent)
        .into_iter()
        .enumerate()
        .map(|(index, node)| snapshot(doc, node, index, query))
        .collect()
}

/// Evaluate every query of a map at the same instant.
pub fn evaluate_map(doc: &Document, map: &QueryMap, parent: Option<NodeId>) -> QueryMapResult {
    map.iter()
        .map(|(name, query)| (name.clone(), evaluate(doc, query, parent)))
        .collect()
}

/// Snapshot of a single element.
///
/// The raw `style` attribute is never copied; the `style` key instead holds
/// the non-empty inline declarations. Geometry is always reported.
pub fn snapshot(doc: &Document, node: NodeId, index: usize, query: &Query) -> ElementSnapshot {
    let mut attrs = BTreeMap::new();

    for attr in doc.attributes(node) {
        if attr.name == ATTR_STYLE || !query.wants_attribute(&attr.name) {
            continue;
        }
        attrs.insert(attr.name.clone(), Value::String(attr.value.clone()));
    }

    if query.wants_sentinel(ATTR_TEXT) {
        attrs.insert(ATTR_TEXT.to_string(), Value::String(doc.text_content(node)));
    }
    if query.wants_sentinel(ATTR_STYLE) {
        let style: Map<String, Value> = doc
            .inline_style(node)
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        attrs.insert(ATTR_STYLE.to_string(), Value::Object(style));
    }
    if query.wants_sentinel(ATTR_NODE) {
        let name = doc.tag_name(node).unwrap_or_default().to_ascii_uppercase();
        attrs.insert(ATTR_NODE.to_string(), Value::String(name));
    }

    let rect = doc.bounding_client_rect(node);
    let children = query.children.as_ref().map(|children| {
        children
            .iter()
            .map(|(name, child)| (name.clone(), evaluate(doc, child, Some(node))))
            .collect()
    });

    ElementSnapshot {
        attrs,
        index,
        coords: Coords::from_rect(rect.x, rect.y, rect.width, rect.height),
        children,
    }
}

#[cfg(test)]
#[path = "evaluate_tests.rs"]
mod tests;
