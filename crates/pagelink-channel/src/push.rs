//! Receiving side of the push side-channel.
//!
//! Pushes fan in to one table keyed by subscription / listener id. A
//! subscription push can overtake the response that tells the caller its id,
//! so an orphan subscription push is held (latest per id) until a callback
//! for that id is registered. Orphan native-event pushes are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use pagelink_protocols::{
    ListenerId, NativeEventPush, PushKey, PushMessage, SubscriptionId, SubscriptionPush,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type SubscriptionCallback = Arc<dyn Fn(SubscriptionPush) + Send + Sync>;
pub type NativeEventCallback = Arc<dyn Fn(NativeEventPush) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    subscriptions: HashMap<SubscriptionId, SubscriptionCallback>,
    native_events: HashMap<ListenerId, NativeEventCallback>,
    held: HashMap<SubscriptionId, SubscriptionPush>,
    forward: Option<mpsc::UnboundedSender<PushMessage>>,
}

/// Callback table for incoming pushes. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct PushListeners {
    inner: Arc<Mutex<ListenerTable>>,
}

impl PushListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback for one subscription.
    ///
    /// A push held for this id is delivered immediately.
    pub fn on_subscription<F>(&self, id: SubscriptionId, callback: F)
    where
        F: Fn(SubscriptionPush) + Send + Sync + 'static,
    {
        let callback: SubscriptionCallback = Arc::new(callback);
        let held = {
            let mut table = self.inner.lock();
            table.subscriptions.insert(id, callback.clone());
            table.held.remove(&id)
        };
        if let Some(push) = held {
            debug!("Delivering held push for {}", id);
            callback(push);
        }
    }

    pub fn on_native_event<F>(&self, id: ListenerId, callback: F)
    where
        F: Fn(NativeEventPush) + Send + Sync + 'static,
    {
        self.inner.lock().native_events.insert(id, Arc::new(callback));
    }

    pub fn remove_subscription(&self, id: SubscriptionId) -> bool {
        let mut table = self.inner.lock();
        table.held.remove(&id);
        table.subscriptions.remove(&id).is_some()
    }

    pub fn remove_native_event(&self, id: ListenerId) -> bool {
        self.inner.lock().native_events.remove(&id).is_some()
    }

    /// Also hand every incoming push to `tx`, e.g. to relay it onwards.
    pub fn forward_to(&self, tx: mpsc::UnboundedSender<PushMessage>) {
        self.inner.lock().forward = Some(tx);
    }

    pub fn held_count(&self) -> usize {
        self.inner.lock().held.len()
    }

    /// Decode a push frame's value and deliver it.
    pub fn dispatch(&self, key: PushKey, value: Value) {
        let message = match key {
            PushKey::Subscription => {
                serde_json::from_value(value).map(PushMessage::Subscription)
            }
            PushKey::NativeEvent => serde_json::from_value(value).map(PushMessage::NativeEvent),
        };
        match message {
            Ok(message) => self.deliver(message),
            Err(e) => warn!("Malformed {:?} push: {}", key, e),
        }
    }

    /// Invoke the callback registered for the message's id.
    ///
    /// Callbacks run outside the table lock, so they may register or remove
    /// listeners themselves.
    pub fn deliver(&self, message: PushMessage) {
        let forwarded = {
            let table = self.inner.lock();
            match &table.forward {
                Some(tx) => tx.send(message.clone()).is_ok(),
                None => false,
            }
        };

        match message {
            PushMessage::Subscription(push) => {
                let callback = {
                    let mut table = self.inner.lock();
                    match table.subscriptions.get(&push.id) {
                        Some(callback) => Some(callback.clone()),
                        None => {
                            if !forwarded {
                                debug!("Holding push for unregistered {}", push.id);
                                table.held.insert(push.id, push.clone());
                            }
                            None
                        }
                    }
                };
                if let Some(callback) = callback {
                    callback(push);
                }
            }
            PushMessage::NativeEvent(push) => {
                let callback = self.inner.lock().native_events.get(&push.event_id).cloned();
                match callback {
                    Some(callback) => callback(push),
                    None if !forwarded => {
                        debug!("Dropping '{}' event for unknown {}", push.event, push.event_id)
                    }
                    None => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelink_protocols::QueryMapResult;
    use serde_json::json;

    fn sub_push(id: u64, url: &str) -> SubscriptionPush {
        SubscriptionPush {
            id: SubscriptionId(id),
            elements: QueryMapResult::new(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_subscription_callback_invoked() {
        let listeners = PushListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        listeners.on_subscription(SubscriptionId(0), move |push| sink.lock().push(push.url));

        listeners.deliver(PushMessage::Subscription(sub_push(0, "https://a.test/")));
        assert_eq!(*seen.lock(), vec!["https://a.test/".to_string()]);
    }

    #[test]
    fn test_orphan_subscription_push_is_held_latest_only() {
        let listeners = PushListeners::new();
        listeners.deliver(PushMessage::Subscription(sub_push(3, "first")));
        listeners.deliver(PushMessage::Subscription(sub_push(3, "second")));
        assert_eq!(listeners.held_count(), 1);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        listeners.on_subscription(SubscriptionId(3), move |push| sink.lock().push(push.url));
        assert_eq!(*seen.lock(), vec!["second".to_string()]);
        assert_eq!(listeners.held_count(), 0);
    }

    #[test]
    fn test_orphan_native_event_dropped() {
        let listeners = PushListeners::new();
        listeners.deliver(PushMessage::NativeEvent(NativeEventPush {
            event: "click".to_string(),
            event_id: ListenerId(0),
        }));
        assert_eq!(listeners.held_count(), 0);

        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        listeners.on_native_event(ListenerId(0), move |_| *sink.lock() += 1);
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn test_dispatch_decodes_wire_value() {
        let listeners = PushListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        listeners.on_native_event(ListenerId(4), move |push| sink.lock().push(push.event));

        listeners.dispatch(PushKey::NativeEvent, json!({"event": "change", "eventId": 4}));
        listeners.dispatch(PushKey::NativeEvent, json!({"bogus": true}));
        assert_eq!(*seen.lock(), vec!["change".to_string()]);
    }

    #[test]
    fn test_remove_subscription_clears_held() {
        let listeners = PushListeners::new();
        listeners.deliver(PushMessage::Subscription(sub_push(1, "x")));
        assert!(!listeners.remove_subscription(SubscriptionId(1)));
        assert_eq!(listeners.held_count(), 0);
    }

    #[test]
    fn test_callback_may_reenter_table() {
        let listeners = PushListeners::new();
        let inner = listeners.clone();
        listeners.on_subscription(SubscriptionId(0), move |push| {
            inner.remove_subscription(push.id);
        });
        listeners.deliver(PushMessage::Subscription(sub_push(0, "x")));
        assert!(!listeners.remove_subscription(SubscriptionId(0)));
    }

    #[test]
    fn test_forwarded_push_is_not_held() {
        let listeners = PushListeners::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        listeners.forward_to(tx);
        listeners.deliver(PushMessage::Subscription(sub_push(2, "y")));
        assert_eq!(listeners.held_count(), 0);
        assert!(matches!(rx.try_recv(), Ok(PushMessage::Subscription(_))));
    }
}
