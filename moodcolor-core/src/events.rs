//! Emotion event notification.
//!
//! An explicit observer list owned by whoever constructs the
//! [`EmotionService`](crate::service::EmotionService). Subscribers get a
//! [`Subscription`] guard; dropping the guard (or calling
//! [`Subscription::unsubscribe`]) removes the listener, so no subscriber can
//! outlive its owner by accident.
//!
//! Listeners are invoked outside the internal lock, which means a listener
//! may itself subscribe or drop other subscriptions without deadlocking.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::types::{EmotionEventType, EmotionType};

/// Payload delivered to subscribers after every recorded emotion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEvent {
    /// Emotion the event is about.
    pub emotion_type: EmotionType,
    /// What happened.
    pub event_type: EmotionEventType,
    /// Live value after the event.
    pub value: f32,
    /// Live intensity after the event.
    pub intensity: f32,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied description, if any.
    pub description: Option<String>,
}

type Listener = Arc<dyn Fn(&EmotionEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Observer list for [`EmotionEvent`]s. Cloning yields a handle to the same list.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. The callback stays registered while the
    /// returned guard is alive.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EmotionEvent) + Send + Sync + 'static,
    {
        let mut reg = self.inner.lock();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.listeners.push((id, Arc::new(listener)));
        debug!(subscription = id, "Emotion event subscriber added");
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Register a channel subscriber. Events are forwarded to the returned
    /// receiver until the guard is dropped or the receiver is closed.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe_channel(&self) -> (Subscription, UnboundedReceiver<EmotionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = self.subscribe(move |event| {
            // A closed receiver just means nobody is listening any more.
            let _ = tx.send(event.clone());
        });
        (sub, rx)
    }

    /// Deliver an event to every current subscriber.
    pub fn publish(&self, event: &EmotionEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Guard for a registered listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Explicitly unsubscribe (same as dropping the guard).
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().listeners.retain(|(id, _)| *id != self.id);
            debug!(subscription = self.id, "Emotion event subscriber removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> EmotionEvent {
        EmotionEvent {
            emotion_type: EmotionType::Joy,
            event_type: EmotionEventType::ValueChanged,
            value: 0.5,
            intensity: 0.5,
            timestamp: Utc::now(),
            description: None,
        }
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = bus.subscribe(move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish(&event());
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(&event());
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn channel_subscriber_receives_events() {
        let bus = EventBus::new();
        let (_sub, mut rx) = bus.subscribe_channel();
        bus.publish(&event());
        let got = rx.try_recv().expect("event delivered");
        assert_eq!(got.emotion_type, EmotionType::Joy);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn listener_may_subscribe_during_publish() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        let nested = Arc::new(Mutex::new(Vec::new()));
        let n = Arc::clone(&nested);
        let _sub = bus.subscribe(move |_| {
            n.lock().push(inner_bus.subscribe(|_| {}));
        });
        bus.publish(&event());
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
