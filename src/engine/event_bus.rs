// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish/subscribe channel for change events.
//!
//! Subscribers are called in subscription order. Each dispatch iterates over the
//! subscribers registered when it started, so a subscriber added from inside a
//! callback only sees later events.

use crate::domain::SettingsEvent;
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Type alias for event callbacks.
pub type EventCallback = Arc<dyn Fn(&SettingsEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, EventCallback)>,
}

/// A cloneable handle to an ordered list of subscribers.
///
/// # Examples
///
/// ```rust
/// use deskcfg::engine::EventBus;
/// use deskcfg::domain::SettingsEvent;
///
/// let bus = EventBus::new();
/// let (_id, rx) = bus.subscribe_channel();
///
/// bus.publish(&SettingsEvent::Local { key: "theme".to_string(), value: None });
/// assert_eq!(rx.try_recv().unwrap().key(), "theme");
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl EventBus {
    /// Creates a bus without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SettingsEvent) + Send + Sync + 'static,
    {
        let mut subscribers = self.lock();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.entries.push((id, Arc::new(callback)));
        id
    }

    /// Registers a channel that receives a clone of every event.
    ///
    /// Events sent after the receiver is dropped are discarded; unsubscribe to
    /// detach the channel for good.
    pub fn subscribe_channel(&self) -> (SubscriptionId, Receiver<SettingsEvent>) {
        let (tx, rx) = channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.entries.len();
        subscribers.entries.retain(|(entry_id, _)| *entry_id != id);
        subscribers.entries.len() != before
    }

    /// Dispatches an event to every current subscriber.
    pub fn publish(&self, event: &SettingsEvent) {
        let callbacks: Vec<EventCallback> = self
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    /// Returns the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
