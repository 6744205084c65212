//! pagelink DOM - the host document
//!
//! Arena-based document tree standing in for the live host page. Node ids
//! are indices into the arena and are never reused, so a detached node keeps
//! its id for as long as the document lives.
//!
//! Every structural, attribute and character-data change made through
//! [`Document`] is appended to the document's single mutation queue; the
//! mutation watcher drains it with [`Document::take_records`].

mod document;
mod error;
mod events;
mod mutation;
mod node;
mod parser;
mod style;

pub use document::Document;
pub use error::DomError;
pub use events::{DomEvent, Listener};
pub use mutation::{MutationRecord, MutationType};
pub use node::{Attribute, ElementData, Node, NodeKind, Rect, Viewport};
pub use style::parse_inline_style;

/// Node identifier (index into the document arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The document node.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}
