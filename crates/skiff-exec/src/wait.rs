//! Blocking wait for a container to reach the stopped state.

use std::sync::Arc;
use std::time::Duration;

use skiff_common::{ContainerId, SkiffError, SkiffResult};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bootstrap::Synchronizer;
use crate::events::{Event, EventManager, LifecycleEventKind, Topic};

/// Removes an ephemeral subscription when the wait exits, matched or not.
struct SubscriptionGuard {
    events: Arc<EventManager>,
    topic: Topic,
    key: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.events.unsubscribe(self.topic, &self.key);
    }
}

impl Synchronizer {
    /// Block until the container reaches the stopped state or the deadline
    /// passes.
    ///
    /// The wait matches lifecycle events for `id` whose kind is the
    /// normalized stop or the raw powered-off notification, whichever
    /// arrives first. The watcher's subscription is released on every exit
    /// path, including cancellation by dropping the returned future.
    ///
    /// # Errors
    ///
    /// Returns [`SkiffError::WaitFailed`] carrying the cause when the
    /// deadline expires before a matching event arrives.
    pub async fn wait_for_container_stop(
        &self,
        id: &ContainerId,
        deadline: Duration,
    ) -> SkiffResult<()> {
        let key = format!("{id}:watcher:{}", Uuid::new_v4().simple());
        let (matched, mut listen) = mpsc::unbounded_channel();

        let subject = id.clone();
        self.events.subscribe(
            Topic::Container,
            key.clone(),
            Arc::new(move |event| {
                if let Event::Container(lifecycle) = event {
                    if lifecycle.subject == subject
                        && matches!(
                            lifecycle.kind,
                            LifecycleEventKind::Stopped | LifecycleEventKind::PoweredOff
                        )
                    {
                        // Only the first match matters; the subscription is
                        // torn down as soon as the wait completes.
                        let _ = matched.send(());
                    }
                }
            }),
        );
        let _guard = SubscriptionGuard {
            events: Arc::clone(&self.events),
            topic: Topic::Container,
            key,
        };

        match tokio::time::timeout(deadline, listen.recv()).await {
            Ok(_) => Ok(()),
            Err(elapsed) => Err(SkiffError::WaitFailed {
                id: id.to_string(),
                cause: elapsed.to_string(),
            }),
        }
    }
}
