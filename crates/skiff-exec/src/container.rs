//! Container instances tracked by the cache.

use skiff_backend::{AttributeSnapshot, ContainerRecord, ObjectRef, Session};
use skiff_common::ContainerId;

use crate::state::ContainerState;

/// A container VM tracked by the control plane.
///
/// Containers are owned by the [`crate::ContainerCache`]; state and
/// attributes are mutated through the cache's atomic mutation surface, by
/// the event dispatcher or by administrative operations.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    state: ContainerState,
    reference: ObjectRef,
    session: Option<Session>,
    attributes: AttributeSnapshot,
}

impl Container {
    /// Create a container entering the cache.
    #[must_use]
    pub const fn new(
        id: ContainerId,
        reference: ObjectRef,
        state: ContainerState,
        attributes: AttributeSnapshot,
    ) -> Self {
        Self {
            id,
            state,
            reference,
            session: None,
            attributes,
        }
    }

    /// ID accessor.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContainerState {
        self.state
    }

    /// Reference to the backing VM.
    #[must_use]
    pub const fn reference(&self) -> &ObjectRef {
        &self.reference
    }

    /// Backend session handle, while the backing VM holds a live connection.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Last-known attribute snapshot.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeSnapshot {
        &self.attributes
    }

    /// Set the lifecycle state.
    pub fn set_state(&mut self, state: ContainerState) {
        self.state = state;
    }

    /// Attach a backend session handle.
    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Store a refreshed attribute snapshot.
    pub fn set_attributes(&mut self, attributes: AttributeSnapshot) {
        self.attributes = attributes;
    }

    /// Release per-container backend resources once the VM has stopped.
    pub fn on_stop(&mut self) {
        self.session = None;
    }
}

impl From<ContainerRecord> for Container {
    fn from(record: ContainerRecord) -> Self {
        Self::new(
            record.id,
            record.reference,
            record.power_state.into(),
            record.attributes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skiff_backend::PowerState;

    fn snapshot(name: &str) -> AttributeSnapshot {
        AttributeSnapshot {
            name: name.to_string(),
            power_state: PowerState::PoweredOn,
            guest_ip: None,
            refreshed: Utc::now(),
        }
    }

    #[test]
    fn record_conversion() {
        let record = ContainerRecord {
            id: ContainerId::new("web-1").unwrap(),
            reference: ObjectRef::virtual_machine("vm-1"),
            power_state: PowerState::PoweredOff,
            attributes: snapshot("web-1"),
        };

        let container = Container::from(record);
        assert_eq!(container.state(), ContainerState::Stopped);
        assert_eq!(container.id().as_str(), "web-1");
        assert!(container.session().is_none());
    }

    #[test]
    fn stop_hook_releases_session() {
        let mut container = Container::new(
            ContainerId::new("web-1").unwrap(),
            ObjectRef::virtual_machine("vm-1"),
            ContainerState::Running,
            snapshot("web-1"),
        );
        container.set_session(Session::new(
            "https://backend.local",
            ObjectRef::new(skiff_backend::ObjectKind::ComputeResource, "cluster-1"),
            skiff_backend::AboutInfo {
                os_type: "linux".to_string(),
                version: "8.0".to_string(),
                product_name: "hypervisor".to_string(),
            },
            skiff_backend::HostCapacity {
                cpu_mhz: 24_000,
                memory_bytes: 64 << 30,
            },
        ));
        assert!(container.session().is_some());

        container.on_stop();
        assert!(container.session().is_none());
    }
}
