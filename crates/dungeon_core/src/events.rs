//! Publish/subscribe channel between gameplay state and its observers.
//!
//! Gameplay code publishes plain integer payloads on a [`Topic`]; the HUD,
//! diagnostics and test harnesses subscribe. Delivery is synchronous and in
//! subscription order. The registry lock is never held while a callback
//! runs, so callbacks may subscribe, unsubscribe or publish re-entrantly.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bevy::prelude::*;
use bevy::utils::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Payload: hit points remaining.
    HealthChanged,
    /// Payload: cumulative coin total.
    CoinsChanged,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::HealthChanged, Topic::CoinsChanged];

    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::HealthChanged => "health-changed",
            Topic::CoinsChanged => "coins-changed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(u32) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<Topic, Vec<Subscriber>>,
}

impl Registry {
    fn contains(&self, topic: Topic, id: SubscriptionId) -> bool {
        self.topics
            .get(&topic)
            .is_some_and(|subs| subs.iter().any(|sub| sub.id == id))
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        for subs in self.topics.values_mut() {
            if let Some(idx) = subs.iter().position(|sub| sub.id == id) {
                subs.remove(idx);
                return true;
            }
        }
        false
    }
}

/// Shared handle to the process-wide channel. Clones refer to the same
/// subscriber registry.
#[derive(Resource, Clone, Default)]
pub struct EventChannel {
    inner: Arc<Mutex<Registry>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        topic: Topic,
        callback: impl Fn(u32) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut registry = self.registry();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.topics.entry(topic).or_default().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        debug!(target: "dungeon_core.events", %topic, id = id.0, "subscribed");
        id
    }

    /// Like [`EventChannel::subscribe`], but the returned guard unsubscribes
    /// when dropped.
    pub fn subscribe_scoped(
        &self,
        topic: Topic,
        callback: impl Fn(u32) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.subscribe(topic, callback);
        Subscription {
            channel: Arc::downgrade(&self.inner),
            id,
            topic,
        }
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry().remove(id);
        if removed {
            debug!(target: "dungeon_core.events", id = id.0, "unsubscribed");
        }
        removed
    }

    /// Delivers `value` to the subscribers registered when the call began.
    /// A subscriber removed mid-publish is skipped; one added mid-publish
    /// waits for the next publish. Returns the number of deliveries.
    pub fn publish(&self, topic: Topic, value: u32) -> usize {
        let snapshot: Vec<(SubscriptionId, Callback)> = self
            .registry()
            .topics
            .get(&topic)
            .map(|subs| {
                subs.iter()
                    .map(|sub| (sub.id, Arc::clone(&sub.callback)))
                    .collect()
            })
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            if !self.registry().contains(topic, id) {
                continue;
            }
            callback(value);
            delivered += 1;
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry().topics.get(&topic).map_or(0, Vec::len)
    }

    /// Drops every remaining subscriber. Anything still registered at this
    /// point outlived its owner, so each one is logged as a leak.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<(Topic, Vec<Subscriber>)> = self.registry().topics.drain().collect();
        let mut leaked = 0;
        for (topic, subs) in drained {
            for sub in subs {
                warn!(target: "dungeon_core.events", %topic, id = sub.id.0, "subscriber leaked past channel shutdown");
                leaked += 1;
            }
        }
        leaked
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped subscription guard from [`EventChannel::subscribe_scoped`].
pub struct Subscription {
    channel: Weak<Mutex<Registry>>,
    id: SubscriptionId,
    topic: Topic,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            EventChannel { inner }.unsubscribe(self.id);
        }
    }
}
