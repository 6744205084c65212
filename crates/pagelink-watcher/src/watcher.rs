//! Mutation watcher.

use pagelink_dom::Document;
use pagelink_protocols::{
    ListenerId, PushMessage, QueryMap, QueryMapResult, Selector, SubscriptionId, SubscriptionPush,
};
use tracing::{debug, trace, warn};

use crate::PushSink;
use crate::arena::SlotArena;
use crate::bridge::EventBridge;

/// A registered query map and the result last delivered for it.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub query_map: QueryMap,
    /// `None` until the first successful delivery.
    pub last_result: Option<QueryMapResult>,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Subscriptions notified, in emission order.
    pub notified: Vec<SubscriptionId>,
    /// Native event handlers bound to newly matched elements.
    pub handlers_bound: usize,
}

/// Owns the subscriptions and the event bridge of one document.
pub struct MutationWatcher {
    subscriptions: SlotArena<Subscription>,
    bridge: EventBridge,
    push: PushSink,
}

impl MutationWatcher {
    pub fn new(push: PushSink) -> Self {
        Self {
            subscriptions: SlotArena::new(),
            bridge: EventBridge::new(push.clone()),
            push,
        }
    }

    /// Register a query map and run a tick so the first result is delivered
    /// without waiting for a mutation.
    pub fn register(&mut self, doc: &mut Document, query_map: QueryMap) -> SubscriptionId {
        let index = self.subscriptions.capacity_used();
        let id = SubscriptionId(index as u64);
        self.subscriptions.insert(Subscription {
            id,
            query_map,
            last_result: None,
        });
        debug!("Registered subscription {}", id);
        self.tick(doc);
        id
    }

    /// Tombstone a subscription. Takes effect from the next tick.
    pub fn unregister(&mut self, id: SubscriptionId) -> bool {
        let removed = usize::try_from(id.0)
            .ok()
            .and_then(|index| self.subscriptions.remove(index))
            .is_some();
        if removed {
            debug!("Unregistered subscription {}", id);
        }
        removed
    }

    pub fn subscription(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(usize::try_from(id.0).ok()?)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.live_count()
    }

    /// Register a native event listener entry.
    pub fn attach_listener(
        &mut self,
        doc: &mut Document,
        selector: Selector,
        events: Vec<String>,
    ) -> ListenerId {
        self.bridge.attach(doc, selector, events)
    }

    pub fn remove_listener(&mut self, doc: &mut Document, id: ListenerId) -> bool {
        self.bridge.remove(doc, id)
    }

    pub fn listener_count(&self) -> usize {
        self.bridge.len()
    }

    /// Drain the document's mutation queue. Returns true if anything changed
    /// since the last call, i.e. the debouncer should be (re)armed.
    pub fn observe(&self, doc: &mut Document) -> bool {
        let records = doc.take_records();
        if records.is_empty() {
            return false;
        }
        trace!("Observed {} mutation records", records.len());
        true
    }

    /// One evaluation pass over every live subscription, then listener
    /// re-application.
    pub fn tick(&mut self, doc: &mut Document) -> TickReport {
        let mut report = TickReport::default();
        let url = doc.url().to_string();

        for index in self.subscriptions.live_indices() {
            // The slot may have been tombstoned since the index list was taken.
            let Some(subscription) = self.subscriptions.get_mut(index) else {
                continue;
            };
            let result = pagelink_query::evaluate_map(doc, &subscription.query_map, None);
            if subscription.last_result.as_ref() == Some(&result) {
                continue;
            }

            let push = PushMessage::Subscription(SubscriptionPush {
                id: subscription.id,
                elements: result.clone(),
                url: url.clone(),
            });
            if self.push.send(push).is_err() {
                warn!("Push channel closed; subscription {} not notified", subscription.id);
                continue;
            }
            subscription.last_result = Some(result);
            report.notified.push(subscription.id);
        }

        report.handlers_bound = self.bridge.apply_all(doc);

        if !report.notified.is_empty() {
            debug!("Tick notified {} subscriptions", report.notified.len());
        }
        report
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
