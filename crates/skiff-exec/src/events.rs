//! Normalized lifecycle events and the event manager that fans them out.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use skiff_backend::{BackendEvent, BackendEventKind, EventSource};
use skiff_common::{ContainerId, SkiffError, SkiffResult};
use tokio::sync::mpsc;

/// Topic on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Raw events from the backend stream.
    Backend,
    /// Normalized container lifecycle events.
    Container,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend => write!(f, "backend/vm"),
            Self::Container => write!(f, "container/lifecycle"),
        }
    }
}

/// Normalized lifecycle event kinds published by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEventKind {
    /// The backing VM finished powering on.
    PoweredOn,
    /// The backing VM finished powering off.
    PoweredOff,
    /// The container was suspended.
    Suspended,
    /// The container was removed.
    Removed,
    /// An administrative stop completed.
    Stopped,
}

impl LifecycleEventKind {
    /// Normalize a raw backend event kind, if it has a lifecycle meaning.
    #[must_use]
    pub fn from_backend(kind: &BackendEventKind) -> Option<Self> {
        match kind {
            BackendEventKind::PoweredOn => Some(Self::PoweredOn),
            BackendEventKind::PoweredOff => Some(Self::PoweredOff),
            BackendEventKind::Suspended => Some(Self::Suspended),
            BackendEventKind::Removed => Some(Self::Removed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoweredOn => write!(f, "powered on"),
            Self::PoweredOff => write!(f, "powered off"),
            Self::Suspended => write!(f, "suspended"),
            Self::Removed => write!(f, "removed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A normalized container lifecycle notification.
///
/// Immutable once constructed; published at most once per transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// The container the event concerns.
    pub subject: ContainerId,
    /// Timestamp of the originating backend event.
    pub created: DateTime<Utc>,
    /// What happened.
    pub kind: LifecycleEventKind,
    /// Human-readable detail.
    pub detail: String,
}

impl LifecycleEvent {
    /// Create a new lifecycle event.
    #[must_use]
    pub fn new(subject: ContainerId, created: DateTime<Utc>, kind: LifecycleEventKind) -> Self {
        let detail = format!("Container {subject} {kind}");
        Self {
            subject,
            created,
            kind,
            detail,
        }
    }
}

/// Any event carried by the bus.
#[derive(Debug, Clone)]
pub enum Event {
    /// A raw backend event.
    Backend(BackendEvent),
    /// A normalized lifecycle event.
    Container(LifecycleEvent),
}

impl Event {
    /// The topic this event is published on.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::Backend(_) => Topic::Backend,
            Self::Container(_) => Topic::Container,
        }
    }
}

/// Callback invoked for each event published on a subscribed topic.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Event manager: owns the backend source pump and the subscriber table.
///
/// Fan-out is synchronous on the publishing task; callbacks must not
/// block. Subscribers are keyed so ephemeral watchers can be removed on
/// every exit path.
pub struct EventManager {
    source: Arc<dyn EventSource>,
    subscribers: RwLock<HashMap<Topic, HashMap<String, EventCallback>>>,
}

impl EventManager {
    /// Create a manager around a backend event source.
    #[must_use]
    pub fn new(source: Arc<dyn EventSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            subscribers: RwLock::new(HashMap::new()),
        })
    }

    /// Start the source and pump raw events onto the backend topic.
    ///
    /// # Errors
    ///
    /// Returns [`SkiffError::EventSource`] if the source fails to start.
    pub async fn start(self: &Arc<Self>) -> SkiffResult<()> {
        let (sink, mut stream) = mpsc::unbounded_channel();
        self.source
            .start(sink)
            .await
            .map_err(|error| SkiffError::EventSource {
                name: self.source.name().to_string(),
                reason: error.to_string(),
            })?;

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                manager.publish(Event::Backend(event));
            }
            tracing::debug!("Backend event stream closed");
        });

        Ok(())
    }

    /// Register `callback` under `key` on `topic`, replacing any previous
    /// subscriber with the same key.
    pub fn subscribe(&self, topic: Topic, key: impl Into<String>, callback: EventCallback) {
        let key = key.into();
        tracing::trace!(%topic, %key, "Subscribing");
        self.subscribers
            .write()
            .entry(topic)
            .or_default()
            .insert(key, callback);
    }

    /// Remove the subscriber registered under `key` on `topic`.
    pub fn unsubscribe(&self, topic: Topic, key: &str) {
        tracing::trace!(%topic, %key, "Unsubscribing");
        if let Some(subscribers) = self.subscribers.write().get_mut(&topic) {
            subscribers.remove(key);
        }
    }

    /// True if a subscriber with `key` is registered on `topic`.
    #[must_use]
    pub fn has_subscriber(&self, topic: Topic, key: &str) -> bool {
        self.subscribers
            .read()
            .get(&topic)
            .is_some_and(|subscribers| subscribers.contains_key(key))
    }

    /// Number of subscribers registered on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .get(&topic)
            .map_or(0, HashMap::len)
    }

    /// Fan the event out to its topic's subscribers on the caller's task.
    pub fn publish(&self, event: Event) {
        // Snapshot the callbacks so a subscriber may (un)subscribe from
        // within its own callback without deadlocking.
        let callbacks: Vec<EventCallback> = self
            .subscribers
            .read()
            .get(&event.topic())
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(&event);
        }
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stopped_event(id: &str) -> Event {
        Event::Container(LifecycleEvent::new(
            ContainerId::new(id).unwrap(),
            Utc::now(),
            LifecycleEventKind::Stopped,
        ))
    }

    struct IdleSource;

    #[async_trait::async_trait]
    impl EventSource for IdleSource {
        fn name(&self) -> &str {
            "idle"
        }

        async fn start(&self, _sink: skiff_backend::EventSink) -> SkiffResult<()> {
            Ok(())
        }
    }

    #[test]
    fn publish_reaches_topic_subscribers() {
        let manager = EventManager::new(Arc::new(IdleSource));
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        manager.subscribe(
            Topic::Container,
            "watcher",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        manager.publish(stopped_event("web-1"));
        manager.publish(stopped_event("web-2"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let manager = EventManager::new(Arc::new(IdleSource));
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        manager.subscribe(
            Topic::Container,
            "watcher",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(manager.has_subscriber(Topic::Container, "watcher"));

        manager.unsubscribe(Topic::Container, "watcher");
        assert!(!manager.has_subscriber(Topic::Container, "watcher"));

        manager.publish(stopped_event("web-1"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn topics_are_isolated() {
        let manager = EventManager::new(Arc::new(IdleSource));
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        manager.subscribe(
            Topic::Backend,
            "watcher",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        manager.publish(stopped_event("web-1"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn event_detail_format() {
        let event = LifecycleEvent::new(
            ContainerId::new("web-1").unwrap(),
            Utc::now(),
            LifecycleEventKind::PoweredOff,
        );
        assert_eq!(event.detail, "Container web-1 powered off");
    }
}
