//! Backend session handle.

use serde::{Deserialize, Serialize};

use crate::reference::ObjectRef;

/// Descriptive information about the backend platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutInfo {
    /// Host operating system type.
    pub os_type: String,
    /// Platform version string.
    pub version: String,
    /// Product name of the virtualization platform.
    pub product_name: String,
}

/// Host capacity visible to the control plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HostCapacity {
    /// Aggregate CPU capacity in MHz.
    pub cpu_mhz: u64,
    /// Memory capacity in bytes.
    pub memory_bytes: u64,
}

/// An authenticated session against the virtualization backend.
///
/// The session is cheap to clone and is handed to containers whose backing
/// VM holds a live connection. Connection state itself lives behind the
/// transport that produced the session.
#[derive(Debug, Clone)]
pub struct Session {
    endpoint: String,
    cluster: ObjectRef,
    about: AboutInfo,
    capacity: HostCapacity,
}

impl Session {
    /// Create a session handle.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        cluster: ObjectRef,
        about: AboutInfo,
        capacity: HostCapacity,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            cluster,
            about,
            capacity,
        }
    }

    /// The backend endpoint this session is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The cluster (or standalone host) this session monitors.
    #[must_use]
    pub const fn cluster(&self) -> &ObjectRef {
        &self.cluster
    }

    /// Platform metadata.
    #[must_use]
    pub const fn about(&self) -> &AboutInfo {
        &self.about
    }

    /// Host capacity limits.
    #[must_use]
    pub const fn capacity(&self) -> HostCapacity {
        self.capacity
    }
}
