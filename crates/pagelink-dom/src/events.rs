//! Event listeners on document nodes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::NodeId;

/// A native listener callback.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice for one
/// node and event type is a no-op, just as the platform ignores a duplicate
/// `(type, callback)` pair.
pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Event delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Node whose listener is currently running.
    pub current_target: NodeId,
}

struct ListenerEntry {
    event_type: String,
    listener: Listener,
}

#[derive(Default)]
pub(crate) struct EventListeners {
    by_node: HashMap<NodeId, Vec<ListenerEntry>>,
}

impl EventListeners {
    /// Returns false when the same listener is already attached.
    pub(crate) fn add(&mut self, node: NodeId, event_type: &str, listener: Listener) -> bool {
        let entries = self.by_node.entry(node).or_default();
        if entries
            .iter()
            .any(|e| e.event_type == event_type && Arc::ptr_eq(&e.listener, &listener))
        {
            return false;
        }
        entries.push(ListenerEntry {
            event_type: event_type.to_string(),
            listener,
        });
        true
    }

    pub(crate) fn remove(&mut self, node: NodeId, event_type: &str, listener: &Listener) -> bool {
        let Some(entries) = self.by_node.get_mut(&node) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| !(e.event_type == event_type && Arc::ptr_eq(&e.listener, listener)));
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.by_node.remove(&node);
        }
        removed
    }

    pub(crate) fn get(&self, node: NodeId, event_type: &str) -> Vec<Listener> {
        self.by_node
            .get(&node)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.event_type == event_type)
                    .map(|e| Arc::clone(&e.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node: NodeId, event_type: &str) -> usize {
        self.by_node
            .get(&node)
            .map(|entries| entries.iter().filter(|e| e.event_type == event_type).count())
            .unwrap_or(0)
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self.by_node.values().map(Vec::len).sum();
        f.debug_struct("EventListeners")
            .field("nodes", &self.by_node.len())
            .field("listeners", &total)
            .finish()
    }
}
