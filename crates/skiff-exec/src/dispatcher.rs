//! Reaction to raw backend events: cache mutation, attribute refresh,
//! lifecycle publication.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use skiff_backend::{AttributeFetcher, BackendEvent, BackendEventKind};
use skiff_common::ContainerId;

use crate::cache::ContainerCache;
use crate::events::{Event, EventManager, LifecycleEvent, LifecycleEventKind, Topic};
use crate::state::{ContainerState, evented_state};

/// Process-lifetime subscriber key for the dispatcher.
pub(crate) const DISPATCH_KEY: &str = "exec";

/// Upper bound on one background attribute refresh.
pub(crate) const ATTRIBUTE_REFRESH_TIMEOUT: Duration = Duration::from_secs(90);

/// Outcome of the atomic read-modify-write on one container.
enum Outcome {
    /// No state change, or a change this core does not react to.
    Ignored,
    /// State was updated in place; attributes need a refresh.
    Transition(ContainerId),
    /// The backing VM is gone; the entry must leave the cache.
    Remove(ContainerId),
}

/// Handles raw backend events on behalf of the container cache.
///
/// The dispatcher never blocks on backend I/O: attribute refreshes run on
/// spawned tasks with their own timeout, so a slow backend cannot stall
/// delivery of subsequent events.
pub(crate) struct Dispatcher {
    cache: Arc<ContainerCache>,
    events: Arc<EventManager>,
    fetcher: Arc<dyn AttributeFetcher>,
}

impl Dispatcher {
    pub(crate) fn new(
        cache: Arc<ContainerCache>,
        events: Arc<EventManager>,
        fetcher: Arc<dyn AttributeFetcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cache,
            events,
            fetcher,
        })
    }

    /// Subscribe to the backend topic under the process-lifetime key.
    pub(crate) fn subscribe(self: &Arc<Self>) {
        let dispatcher = Arc::clone(self);
        self.events.subscribe(
            Topic::Backend,
            DISPATCH_KEY,
            Arc::new(move |event| {
                if let Event::Backend(backend_event) = event {
                    dispatcher.dispatch(backend_event);
                }
            }),
        );
    }

    /// React to one raw backend event.
    pub(crate) fn dispatch(&self, event: &BackendEvent) {
        // Events for VMs this control plane does not own are dropped.
        let Some(outcome) = self.cache.with_mut(&event.subject, |container| {
            let next = evented_state(&event.kind, container.state());
            if next == container.state() {
                return Outcome::Ignored;
            }

            match next {
                ContainerState::Stopping
                | ContainerState::Running
                | ContainerState::Stopped
                | ContainerState::Suspended => {
                    tracing::debug!(
                        container = %container.id(),
                        state = %next,
                        "Container state set via event activity"
                    );
                    container.set_state(next);
                    if next == ContainerState::Stopped {
                        container.on_stop();
                    }
                    Outcome::Transition(container.id().clone())
                }
                ContainerState::Removed => {
                    tracing::debug!(container = %container.id(), "Container removed via event activity");
                    Outcome::Remove(container.id().clone())
                }
                _ => Outcome::Ignored,
            }
        }) else {
            tracing::trace!(subject = %event.subject, "Event for untracked container dropped");
            return;
        };

        match outcome {
            Outcome::Ignored => {}
            Outcome::Transition(id) => self.refresh_then_publish(id, event),
            Outcome::Remove(id) => {
                if self.cache.remove(&id).is_some() {
                    publish_lifecycle(&self.events, &id, event.created, &event.kind);
                }
            }
        }
    }

    /// Refresh the container's attributes off the delivery task, then
    /// publish the lifecycle event. Publication does not depend on the
    /// refresh outcome.
    fn refresh_then_publish(&self, id: ContainerId, event: &BackendEvent) {
        let cache = Arc::clone(&self.cache);
        let events = Arc::clone(&self.events);
        let fetcher = Arc::clone(&self.fetcher);
        let reference = event.subject.clone();
        let kind = event.kind.clone();
        let created = event.created;

        tokio::spawn(async move {
            match tokio::time::timeout(
                ATTRIBUTE_REFRESH_TIMEOUT,
                fetcher.refresh(&id, &reference),
            )
            .await
            {
                Ok(Ok(attributes)) => cache.update_attributes(&id, attributes),
                Ok(Err(error)) => {
                    tracing::error!(container = %id, %error, "Event driven attribute refresh failed");
                }
                Err(_) => {
                    tracing::error!(container = %id, "Event driven attribute refresh timed out");
                }
            }

            publish_lifecycle(&events, &id, created, &kind);
        });
    }
}

/// Publish the normalized lifecycle event for one observed transition.
fn publish_lifecycle(
    events: &EventManager,
    id: &ContainerId,
    created: DateTime<Utc>,
    kind: &BackendEventKind,
) {
    let Some(kind) = LifecycleEventKind::from_backend(kind) else {
        return;
    };
    events.publish(Event::Container(LifecycleEvent::new(
        id.clone(),
        created,
        kind,
    )));
}
