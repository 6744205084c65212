//! DOM errors.

use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Node is not an element: {0:?}")]
    NotAnElement(NodeId),

    #[error("Node is not a text node: {0:?}")]
    NotText(NodeId),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("HTML parse error: {0}")]
    Parse(String),
}
