//! Native event bridge.
//!
//! Binds host event listeners to every element a selector matches and turns
//! each firing into a `nativeEvent` push. The notifier closure for one
//! `(event type, listener id)` pair is created once and reused, so binding an
//! already-bound element again hands the document the same handler and the
//! document's duplicate check makes it a no-op.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use pagelink_dom::{DomEvent, Document, Listener, NodeId};
use pagelink_protocols::{ListenerId, NativeEventPush, PushMessage, Selector};
use tracing::{debug, trace};

use crate::PushSink;
use crate::arena::SlotArena;

/// A registered selector plus the event types it listens for.
#[derive(Debug, Clone)]
struct ListenerEntry {
    selector: Selector,
    events: Vec<String>,
    /// Elements currently carrying this entry's notifiers.
    bound: HashSet<NodeId>,
}

pub struct EventBridge {
    entries: SlotArena<ListenerEntry>,
    notifiers: HashMap<(String, ListenerId), Listener>,
    push: PushSink,
}

impl EventBridge {
    pub fn new(push: PushSink) -> Self {
        Self {
            entries: SlotArena::new(),
            notifiers: HashMap::new(),
            push,
        }
    }

    /// Register `selector` for `events` and bind the current matches.
    pub fn attach(&mut self, doc: &mut Document, selector: Selector, events: Vec<String>) -> ListenerId {
        let index = self.entries.insert(ListenerEntry {
            selector,
            events,
            bound: HashSet::new(),
        });
        let id = ListenerId(index as u64);
        let bound = self.apply(doc, index);
        debug!("Registered native listener {} ({} elements bound)", id, bound);
        id
    }

    /// Unbind and tombstone a listener entry. Returns false for unknown ids.
    pub fn remove(&mut self, doc: &mut Document, id: ListenerId) -> bool {
        let Some(entry) = usize::try_from(id.0).ok().and_then(|i| self.entries.remove(i)) else {
            return false;
        };
        for event in &entry.events {
            if let Some(notifier) = self.notifiers.remove(&(event.clone(), id)) {
                for &node in &entry.bound {
                    doc.remove_event_listener(node, event, &notifier);
                }
            }
        }
        debug!("Removed native listener {}", id);
        true
    }

    /// Re-bind every live entry; returns the number of new handlers.
    pub fn apply_all(&mut self, doc: &mut Document) -> usize {
        self.entries
            .live_indices()
            .into_iter()
            .map(|index| self.apply(doc, index))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply(&mut self, doc: &mut Document, index: usize) -> usize {
        let Some(entry) = self.entries.get(index) else {
            return 0;
        };
        let id = ListenerId(index as u64);
        let matches = pagelink_query::resolve(doc, &entry.selector, None);
        let events = entry.events.clone();

        let mut newly_bound = Vec::new();
        for &node in &matches {
            for event in &events {
                let notifier = self.notifier(event, id);
                // Ids come from `resolve`, so the node exists.
                if let Ok(true) = doc.add_event_listener(node, event, notifier) {
                    newly_bound.push(node);
                }
            }
        }

        let count = newly_bound.len();
        if let Some(entry) = self.entries.get_mut(index) {
            entry.bound.extend(newly_bound);
        }
        if count > 0 {
            trace!("Listener {} bound {} new handlers", id, count);
        }
        count
    }

    fn notifier(&mut self, event: &str, id: ListenerId) -> Listener {
        let notifier = self
            .notifiers
            .entry((event.to_string(), id))
            .or_insert_with(|| {
                let push = self.push.clone();
                let event = event.to_string();
                Arc::new(move |_: &DomEvent| {
                    let message = PushMessage::NativeEvent(NativeEventPush {
                        event: event.clone(),
                        event_id: id,
                    });
                    if push.send(message).is_err() {
                        trace!("Native event {} dropped: push channel closed", id);
                    }
                })
            });
        Arc::clone(notifier)
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
