//! Concurrent cache of containers known to the control plane.

use dashmap::DashMap;
use skiff_backend::{AttributeSnapshot, Inventory, ObjectRef};
use skiff_common::{ContainerId, SkiffError, SkiffResult};

use crate::container::Container;
use crate::state::ContainerState;

/// The authoritative in-memory set of known containers.
///
/// Keyed by container ID with a secondary index keyed by backend reference.
/// All operations are safe under concurrent invocation; a read never
/// observes a partially updated container, and read-modify-write of a
/// single container through [`ContainerCache::with_mut`] is atomic with
/// respect to other writers of that container.
#[derive(Debug, Default)]
pub struct ContainerCache {
    containers: DashMap<ContainerId, Container>,
    refs: DashMap<ObjectRef, ContainerId>,
}

impl ContainerCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// True if no containers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// True if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &ContainerId) -> bool {
        self.containers.contains_key(id)
    }

    /// Look up a container by ID, returning a point-in-time clone.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<Container> {
        self.containers.get(id).map(|entry| entry.value().clone())
    }

    /// Look up a container by its backend reference.
    #[must_use]
    pub fn get_by_ref(&self, reference: &ObjectRef) -> Option<Container> {
        let id = self.refs.get(reference).map(|entry| entry.value().clone())?;
        self.get(&id)
    }

    /// Insert or replace a container, updating the reference index.
    pub fn insert(&self, container: Container) {
        let id = container.id().clone();
        let reference = container.reference().clone();

        self.refs.insert(reference.clone(), id.clone());
        if let Some(previous) = self.containers.insert(id, container) {
            // A replaced entry may have been re-registered under a new
            // backing VM; drop the stale index entry if so.
            if previous.reference() != &reference {
                self.refs.remove(previous.reference());
            }
        }
    }

    /// Atomically mutate the container backing `reference`.
    ///
    /// The closure runs under the container's write lock; no other reader
    /// or writer observes the entry mid-mutation. Returns `None` if the
    /// reference is not tracked.
    pub fn with_mut<R>(
        &self,
        reference: &ObjectRef,
        f: impl FnOnce(&mut Container) -> R,
    ) -> Option<R> {
        let id = self.refs.get(reference).map(|entry| entry.value().clone())?;
        let mut entry = self.containers.get_mut(&id)?;
        Some(f(entry.value_mut()))
    }

    /// Remove a container. Returns the removed entry, or `None` if `id`
    /// was already gone; each entry is removed exactly once.
    pub fn remove(&self, id: &ContainerId) -> Option<Container> {
        let (_, container) = self.containers.remove(id)?;
        self.refs.remove(container.reference());
        Some(container)
    }

    /// Administrative state write, for intent transitions driven by
    /// explicit operations.
    ///
    /// # Errors
    ///
    /// Returns [`SkiffError::ContainerNotFound`] if `id` is not tracked.
    pub fn set_state(&self, id: &ContainerId, state: ContainerState) -> SkiffResult<()> {
        let mut entry = self
            .containers
            .get_mut(id)
            .ok_or_else(|| SkiffError::ContainerNotFound { id: id.to_string() })?;
        tracing::debug!(container = %id, %state, "Container state set");
        entry.value_mut().set_state(state);
        Ok(())
    }

    /// Store a refreshed attribute snapshot, ignoring containers that
    /// vanished since the refresh began.
    pub fn update_attributes(&self, id: &ContainerId, attributes: AttributeSnapshot) {
        if let Some(mut entry) = self.containers.get_mut(id) {
            entry.value_mut().set_attributes(attributes);
        }
    }

    /// Populate the cache from the authoritative backend inventory.
    ///
    /// This is the only bulk-population path and runs once at bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be listed.
    pub async fn sync(&self, inventory: &dyn Inventory) -> SkiffResult<()> {
        let records = inventory.list().await?;

        self.containers.clear();
        self.refs.clear();
        for record in records {
            self.insert(Container::from(record));
        }

        tracing::debug!(count = self.len(), "Synced container cache from inventory");
        Ok(())
    }
}
