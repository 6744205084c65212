//! Selector resolution.

use pagelink_dom::{Document, NodeId};
use pagelink_protocols::{Addressing, Selector};
use tracing::warn;

use crate::path::PathExpr;
use crate::range::apply_range;
use crate::rule::RuleSelector;
use crate::SelectorError;

/// Resolve `selector` against `parent`, or the whole document when `None`.
///
/// Malformed patterns resolve to an empty list and are logged at `warn`.
pub fn resolve(doc: &Document, selector: &Selector, parent: Option<NodeId>) -> Vec<NodeId> {
    match try_resolve(doc, selector, parent) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!("Selector resolution failed: {}", e);
            Vec::new()
        }
    }
}

/// Like [`resolve`], but reports pattern errors instead of swallowing them.
pub fn try_resolve(
    doc: &Document,
    selector: &Selector,
    parent: Option<NodeId>,
) -> Result<Vec<NodeId>, SelectorError> {
    let scope = parent.unwrap_or_else(|| doc.root());
    let matched = match selector.addressing {
        Addressing::Rule => RuleSelector::parse(&selector.pattern)?.select(doc, scope),
        Addressing::Path => PathExpr::parse(&selector.pattern)?.select(doc, scope)?,
    };
    Ok(apply_range(matched, selector.range.as_ref()))
}
