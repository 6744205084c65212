//! The host document.

use tracing::trace;

use crate::events::{DomEvent, EventListeners, Listener};
use crate::mutation::MutationRecord;
use crate::node::{Attribute, ElementData, Node, NodeKind, Rect, Viewport};
use crate::{DomError, NodeId};

/// Host document: node arena plus page-level state.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    url: String,
    cookie: String,
    viewport: Viewport,
    active_element: Option<NodeId>,
    records: Vec<MutationRecord>,
    listeners: EventListeners,
}

impl Document {
    /// Create a document with the `html`, `head` and `body` skeleton.
    pub fn new(url: &str) -> Self {
        let mut doc = Self::empty(url);
        let html = doc.alloc(NodeKind::Element(ElementData::new("html")));
        let head = doc.alloc(NodeKind::Element(ElementData::new("head")));
        let body = doc.alloc(NodeKind::Element(ElementData::new("body")));
        doc.link(NodeId::ROOT, html, None);
        doc.link(html, head, None);
        doc.link(html, body, None);
        doc
    }

    /// Create a document holding only the document node.
    pub fn empty(url: &str) -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            url: url.to_string(),
            cookie: String::new(),
            viewport: Viewport::default(),
            active_element: None,
            records: Vec::new(),
            listeners: EventListeners::default(),
        }
    }

    /// Parse an HTML string. Parsing does not produce mutation records.
    pub fn parse_html(html: &str, url: &str) -> Result<Self, DomError> {
        crate::parser::parse_into(html, url)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The document node always exists.
        false
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// The `html` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(NodeId::ROOT).into_iter().next()
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|&id| self.tag_name(id) == Some("body"))
    }

    // ---- node creation ----

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment(text.to_string()))
    }

    // ---- tree mutation ----

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or at the end).
    ///
    /// A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child, reference)?;
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.unlink(old_parent, child);
            self.record(MutationRecord::child_list(old_parent, vec![], vec![child]));
        }
        self.link(parent, child, reference);
        self.record(MutationRecord::child_list(parent, vec![child], vec![]));
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.require(parent)?;
        self.require(child)?;
        if self.nodes[child.0].parent != Some(parent) {
            return Err(DomError::HierarchyRequest(format!(
                "{child:?} is not a child of {parent:?}"
            )));
        }
        // Record before unlinking so the connectedness check sees the parent.
        self.record(MutationRecord::child_list(parent, vec![], vec![child]));
        self.unlink(parent, child);
        Ok(())
    }

    /// Detach `node` from its parent, if it has one.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.require(node)?;
        match self.nodes[node.0].parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let elem = self.element_mut(node)?;
        let old = elem.set_attr(name, value);
        self.record(MutationRecord::attribute(node, name, old));
        Ok(())
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let elem = self.element_mut(node)?;
        let old = elem.remove_attr(name);
        if old.is_some() {
            self.record(MutationRecord::attribute(node, name, old.clone()));
        }
        Ok(old)
    }

    /// Replace the data of a text or comment node.
    pub fn set_character_data(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.require(node)?;
        let old = match &mut self.nodes[node.0].kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => std::mem::replace(t, text.to_string()),
            _ => return Err(DomError::NotText(node)),
        };
        self.record(MutationRecord::character_data(node, old));
        Ok(())
    }

    /// Replace all children of `node` with a single text node.
    ///
    /// Setting text on a text node changes its data instead.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.require(node)?;
        if self.nodes[node.0].as_text().is_some() {
            return self.set_character_data(node, text);
        }
        let removed = std::mem::take(&mut self.nodes[node.0].children);
        for &child in &removed {
            self.nodes[child.0].parent = None;
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let id = self.create_text_node(text);
            self.link(node, id, None);
            added.push(id);
        }
        self.record(MutationRecord::child_list(node, added, removed));
        Ok(())
    }

    /// Attach without recording; used while building a parsed tree.
    pub(crate) fn attach_silently(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child, None)?;
        self.link(parent, child, None);
        Ok(())
    }

    fn check_insert(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.require(parent)?;
        self.require(child)?;
        if matches!(
            self.nodes[parent.0].kind,
            NodeKind::Text(_) | NodeKind::Comment(_)
        ) {
            return Err(DomError::HierarchyRequest(format!(
                "{parent:?} cannot have children"
            )));
        }
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "inserting {child:?} under {parent:?} would create a cycle"
            )));
        }
        if let Some(reference) = reference {
            self.require(reference)?;
            if self.nodes[reference.0].parent != Some(parent) {
                return Err(DomError::HierarchyRequest(format!(
                    "{reference:?} is not a child of {parent:?}"
                )));
            }
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let children = &mut self.nodes[parent.0].children;
        let pos = reference
            .and_then(|r| children.iter().position(|&c| c == r))
            .unwrap_or(children.len());
        children.insert(pos, child);
        self.nodes[child.0].parent = Some(parent);
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|&c| c != child);
        self.nodes[child.0].parent = None;
    }

    fn record(&mut self, record: MutationRecord) {
        // Changes to detached subtrees are invisible to observers.
        if self.is_connected(record.target) {
            trace!("mutation: {:?} on {:?}", record.mutation_type, record.target);
            self.records.push(record);
        }
    }

    /// Drain the pending mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    // ---- tree queries ----

    fn require(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::NodeNotFound(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(DomError::NodeNotFound(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id)?.as_element()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.get_attr(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Attributes in declaration order; empty for non-elements.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Descendants in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_element(n))
            .collect()
    }

    /// Inclusive containment: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some() && self.contains(NodeId::ROOT, id)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(t)) | Some(NodeKind::Comment(t)) => t.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| self.node(n).and_then(Node::as_text))
                .collect(),
            None => String::new(),
        }
    }

    /// Non-empty inline style declarations of an element.
    pub fn inline_style(&self, id: NodeId) -> Vec<(String, String)> {
        self.get_attribute(id, "style")
            .map(crate::style::parse_inline_style)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .find(|&n| self.get_attribute(n, "id") == Some(element_id))
    }

    // ---- page state ----

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// Raw `document.cookie` string.
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn set_cookie(&mut self, cookie: &str) {
        self.cookie = cookie.to_string();
    }

    /// Value of one cookie from the `name=value; ...` string.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.cookie.split(';').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == name).then(|| v.trim().to_string())
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.viewport.scroll_x = x;
        self.viewport.scroll_y = y;
    }

    /// Set the page-coordinate layout box of an element.
    pub fn set_layout_box(&mut self, id: NodeId, rect: Rect) -> Result<(), DomError> {
        self.element_mut(id)?.layout = Some(rect);
        Ok(())
    }

    pub fn layout(&self, id: NodeId) -> Option<Rect> {
        self.element(id)?.layout
    }

    /// Bounding box relative to the viewport. Elements without layout are
    /// zero-sized at the origin.
    pub fn bounding_client_rect(&self, id: NodeId) -> Rect {
        match self.layout(id) {
            Some(r) => Rect::new(
                r.x - self.viewport.scroll_x,
                r.y - self.viewport.scroll_y,
                r.width,
                r.height,
            ),
            None => Rect::default(),
        }
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.element_mut(id)?;
        self.active_element = Some(id);
        Ok(())
    }

    pub fn blur(&mut self) {
        self.active_element = None;
    }

    // ---- events ----

    /// Returns false if this exact listener is already attached.
    pub fn add_event_listener(
        &mut self,
        id: NodeId,
        event_type: &str,
        listener: Listener,
    ) -> Result<bool, DomError> {
        self.require(id)?;
        Ok(self.listeners.add(id, event_type, listener))
    }

    pub fn remove_event_listener(&mut self, id: NodeId, event_type: &str, listener: &Listener) -> bool {
        self.listeners.remove(id, event_type, listener)
    }

    pub fn listener_count(&self, id: NodeId, event_type: &str) -> usize {
        self.listeners.count(id, event_type)
    }

    /// Dispatch an event at `target`, bubbling to the document node.
    ///
    /// Returns the number of listener invocations.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> Result<usize, DomError> {
        self.require(target)?;
        let mut invoked = 0;
        let path = std::iter::once(target).chain(self.ancestors(target));
        for current in path {
            for listener in self.listeners.get(current, event_type) {
                let event = DomEvent {
                    event_type: event_type.to_string(),
                    target,
                    current_target: current,
                };
                listener(&event);
                invoked += 1;
            }
        }
        trace!("dispatched {} on {:?} to {} listeners", event_type, target, invoked);
        Ok(invoked)
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
