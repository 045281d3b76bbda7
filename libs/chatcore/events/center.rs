//! Event fan-out
//!
//! The center never owns its subscribers. Closure subscribers are kept
//! alive by the `Subscription` handle returned to the caller; trait-object
//! subscribers by whoever holds their `Arc`. Once the owner lets go, the
//! entry is skipped and pruned on the next dispatch.

use crate::domain::ChannelId;
use crate::events::event::{ChatEvent, EventType};
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Session facts filters may consult
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeContext {
    pub current_user_id: Option<String>,
    pub connection_id: Option<String>,
}

type Predicate = dyn Fn(&ChatEvent, &ScopeContext) -> bool + Send + Sync;

/// Predicate deciding whether a subscriber sees an event
#[derive(Clone)]
pub struct EventFilter {
    predicate: Arc<Predicate>,
}

impl EventFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&ChatEvent, &ScopeContext) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    #[inline]
    pub fn matches(&self, event: &ChatEvent, scope: &ScopeContext) -> bool {
        (self.predicate)(event, scope)
    }

    /// Events routed to one channel
    pub fn channel(cid: ChannelId) -> Self {
        Self::new(move |event, _| event.cid.as_ref() == Some(&cid))
    }

    /// Events of the listed types; `Unknown` never matches
    pub fn event_types(types: impl IntoIterator<Item = EventType>) -> Self {
        let types: HashSet<EventType> = types.into_iter().collect();
        Self::new(move |event, _| event.event_type().map_or(false, |t| types.contains(&t)))
    }

    /// Drop events caused by the current user
    pub fn not_from_current_user() -> Self {
        Self::new(|event, scope| match (event.event.user(), &scope.current_user_id) {
            (Some(user), Some(current)) => &user.id != current,
            _ => true,
        })
    }

    /// Both filters must pass
    pub fn and(self, other: EventFilter) -> Self {
        Self::new(move |event, scope| self.matches(event, scope) && other.matches(event, scope))
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventFilter")
    }
}

/// Trait-object subscriber, held weakly by the center
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &ChatEvent);
}

type Handler = dyn Fn(&ChatEvent) + Send + Sync;

enum Target {
    Closure(Weak<Handler>),
    Subscriber(Weak<dyn EventSubscriber>),
}

enum LiveTarget {
    Closure(Arc<Handler>),
    Subscriber(Arc<dyn EventSubscriber>),
}

impl Target {
    fn upgrade(&self) -> Option<LiveTarget> {
        match self {
            Target::Closure(weak) => weak.upgrade().map(LiveTarget::Closure),
            Target::Subscriber(weak) => weak.upgrade().map(LiveTarget::Subscriber),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Target::Closure(weak) => weak.strong_count() > 0,
            Target::Subscriber(weak) => weak.strong_count() > 0,
        }
    }
}

struct Entry {
    id: u64,
    filter: Option<EventFilter>,
    target: Target,
}

#[derive(Default)]
struct Inner {
    entries: RwLock<Vec<Entry>>,
    scope: RwLock<ScopeContext>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove(&self, id: u64) {
        self.entries.write().retain(|entry| entry.id != id);
    }
}

/// Identifier of a registration, for explicit removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Handle that keeps a closure subscription alive
///
/// Dropping it (or calling `unsubscribe`) ends delivery.
#[must_use = "the subscription ends when this handle is dropped"]
pub struct Subscription {
    id: SubscriptionId,
    center: Weak<Inner>,
    _handler: Arc<Handler>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(center) = self.center.upgrade() {
            center.remove(self.id.0);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Fan-out of decoded events to filtered subscribers
#[derive(Clone, Default)]
pub struct EventNotificationCenter {
    inner: Arc<Inner>,
}

impl EventNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, filter: Option<EventFilter>, target: Target) -> SubscriptionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.write().push(Entry { id, filter, target });
        SubscriptionId(id)
    }

    /// Subscribe a closure; delivery lasts as long as the returned handle
    pub fn subscribe<F>(&self, filter: Option<EventFilter>, handler: F) -> Subscription
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        let handler: Arc<Handler> = Arc::new(handler);
        let id = self.register(filter, Target::Closure(Arc::downgrade(&handler)));
        Subscription {
            id,
            center: Arc::downgrade(&self.inner),
            _handler: handler,
        }
    }

    /// Subscribe a trait object without taking ownership of it
    pub fn subscribe_weak<S>(&self, filter: Option<EventFilter>, subscriber: &Arc<S>) -> SubscriptionId
    where
        S: EventSubscriber + 'static,
    {
        let subscriber: Arc<dyn EventSubscriber> = subscriber.clone();
        let weak = Arc::downgrade(&subscriber);
        self.register(filter, Target::Subscriber(weak))
    }

    /// Subscribe through a channel; delivery lasts as long as the handle
    pub fn subscribe_channel(&self, filter: Option<EventFilter>) -> (Subscription, Receiver<ChatEvent>) {
        let (tx, rx) = unbounded();
        let subscription = self.subscribe(filter, move |event| {
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.remove(id.0);
    }

    /// Number of registrations whose owner is still alive
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .entries
            .read()
            .iter()
            .filter(|entry| entry.target.is_alive())
            .count()
    }

    pub fn scope(&self) -> ScopeContext {
        self.inner.scope.read().clone()
    }

    pub fn set_scope(&self, scope: ScopeContext) {
        *self.inner.scope.write() = scope;
    }

    pub fn set_connection_id(&self, connection_id: Option<String>) {
        self.inner.scope.write().connection_id = connection_id;
    }

    pub fn set_current_user_id(&self, user_id: Option<String>) {
        self.inner.scope.write().current_user_id = user_id;
    }

    /// Deliver one event; returns how many subscribers received it
    ///
    /// Handlers run without any internal lock held, so they may subscribe
    /// or unsubscribe from inside a callback.
    pub fn process(&self, event: &ChatEvent) -> usize {
        let scope = self.scope();
        let mut dead = false;

        let targets: Vec<LiveTarget> = {
            let entries = self.inner.entries.read();
            entries
                .iter()
                .filter_map(|entry| {
                    let target = entry.target.upgrade();
                    if target.is_none() {
                        dead = true;
                        return None;
                    }
                    let passes = entry
                        .filter
                        .as_ref()
                        .map_or(true, |filter| filter.matches(event, &scope));
                    if passes {
                        target
                    } else {
                        None
                    }
                })
                .collect()
        };

        if dead {
            let mut entries = self.inner.entries.write();
            let before = entries.len();
            entries.retain(|entry| entry.target.is_alive());
            debug!("Pruned {} dead subscribers", before - entries.len());
        }

        trace!(
            "Dispatching {} to {} subscribers",
            event.event.raw_type(),
            targets.len()
        );

        for target in &targets {
            match target {
                LiveTarget::Closure(handler) => handler(event),
                LiveTarget::Subscriber(subscriber) => subscriber.on_event(event),
            }
        }

        targets.len()
    }
}
