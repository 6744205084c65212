//! Simulated user input on selector-addressed elements.
//!
//! Every action targets the first element the selector resolves to and
//! fires the same native event sequence a real user gesture would, so page
//! handlers and bridged listeners observe it.

use pagelink_dom::{Document, NodeId};
use pagelink_protocols::Selector;
use tracing::debug;

use crate::error::HostError;

/// First element `selector` resolves to.
pub fn first_match(doc: &Document, selector: &Selector) -> Result<NodeId, HostError> {
    pagelink_query::resolve(doc, selector, None)
        .into_iter()
        .next()
        .ok_or_else(|| HostError::NoMatch(selector.pattern.clone()))
}

fn fire(doc: &Document, target: NodeId, events: &[&str]) -> Result<(), HostError> {
    for event in events {
        doc.dispatch_event(target, event)?;
    }
    Ok(())
}

pub fn click(doc: &mut Document, selector: &Selector) -> Result<(), HostError> {
    let target = first_match(doc, selector)?;
    debug!("click on '{}'", selector.pattern);
    doc.focus(target)?;
    fire(doc, target, &["mousedown", "mouseup", "click"])
}

pub fn double_click(doc: &mut Document, selector: &Selector) -> Result<(), HostError> {
    let target = first_match(doc, selector)?;
    debug!("double click on '{}'", selector.pattern);
    doc.focus(target)?;
    fire(doc, target, &["mousedown", "mouseup", "click", "dblclick"])
}

fn is_form_control(doc: &Document, node: NodeId) -> bool {
    matches!(doc.tag_name(node), Some("input" | "textarea" | "select"))
}

/// Focus the element and enter `text` into it.
///
/// Form controls receive it as their `value`, other elements as text
/// content.
pub fn type_text(
    doc: &mut Document,
    selector: &Selector,
    text: &str,
    append: bool,
) -> Result<(), HostError> {
    let target = first_match(doc, selector)?;
    debug!("typing {} chars into '{}'", text.chars().count(), selector.pattern);
    doc.focus(target)?;

    if is_form_control(doc, target) {
        let value = match (append, doc.get_attribute(target, "value")) {
            (true, Some(current)) => format!("{}{}", current, text),
            _ => text.to_string(),
        };
        doc.set_attribute(target, "value", &value)?;
    } else {
        let content = if append {
            format!("{}{}", doc.text_content(target), text)
        } else {
            text.to_string()
        };
        doc.set_text_content(target, &content)?;
    }
    fire(doc, target, &["input", "change"])
}

/// Option value as submitted: its `value` attribute, else its text.
fn option_value(doc: &Document, option: NodeId) -> String {
    match doc.get_attribute(option, "value") {
        Some(value) => value.to_string(),
        None => doc.text_content(option).trim().to_string(),
    }
}

pub fn select_option(doc: &mut Document, selector: &Selector, value: &str) -> Result<(), HostError> {
    let target = first_match(doc, selector)?;
    if doc.tag_name(target) != Some("select") {
        return Err(HostError::WrongElement {
            pattern: selector.pattern.clone(),
            expected: "select",
        });
    }

    let options: Vec<NodeId> = doc
        .descendant_elements(target)
        .into_iter()
        .filter(|&node| doc.tag_name(node) == Some("option"))
        .collect();
    let chosen = options
        .iter()
        .copied()
        .find(|&option| option_value(doc, option) == value)
        .ok_or_else(|| HostError::NoOption(value.to_string()))?;

    for option in options {
        if option == chosen {
            if !doc.has_attribute(option, "selected") {
                doc.set_attribute(option, "selected", "")?;
            }
        } else if doc.has_attribute(option, "selected") {
            doc.remove_attribute(option, "selected")?;
        }
    }
    doc.set_attribute(target, "value", value)?;
    debug!("selected '{}' in '{}'", value, selector.pattern);
    fire(doc, target, &["input", "change"])
}

pub fn drag_drop(doc: &mut Document, source: &Selector, target: &Selector) -> Result<(), HostError> {
    let from = first_match(doc, source)?;
    let to = first_match(doc, target)?;
    debug!("drag '{}' onto '{}'", source.pattern, target.pattern);
    fire(doc, from, &["dragstart"])?;
    fire(doc, to, &["dragenter", "dragover", "drop"])?;
    fire(doc, from, &["dragend"])
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
