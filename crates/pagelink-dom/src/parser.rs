//! HTML parsing.
//!
//! Parses with html5ever into an `RcDom`, then copies the tree into the
//! arena. Whitespace-only text nodes are dropped.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use tracing::debug;

use crate::node::{ElementData, NodeKind};
use crate::{Document, DomError, NodeId};

pub(crate) fn parse_into(html: &str, url: &str) -> Result<Document, DomError> {
    debug!("Parsing HTML document: {}", url);

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| DomError::Parse(e.to_string()))?;

    let mut document = Document::empty(url);
    convert_node(&dom.document, &mut document, NodeId::ROOT)?;

    debug!("Parsed {} nodes", document.len());
    Ok(document)
}

fn convert_node(handle: &Handle, doc: &mut Document, parent: NodeId) -> Result<(), DomError> {
    match &handle.data {
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert_node(child, doc, parent)?;
            }
        }
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if !text.trim().is_empty() {
                let id = doc.alloc(NodeKind::Text(text));
                doc.attach_silently(parent, id)?;
            }
        }
        RcNodeData::Comment { contents } => {
            let id = doc.alloc(NodeKind::Comment(contents.to_string()));
            doc.attach_silently(parent, id)?;
        }
        RcNodeData::Element { name, attrs, .. } => {
            let mut elem = ElementData::new(name.local.as_ref());
            for attr in attrs.borrow().iter() {
                elem.set_attr(attr.name.local.as_ref(), &attr.value);
            }
            let id = doc.alloc(NodeKind::Element(elem));
            doc.attach_silently(parent, id)?;
            for child in handle.children.borrow().iter() {
                convert_node(child, doc, id)?;
            }
        }
        RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {}
    }
    Ok(())
}
