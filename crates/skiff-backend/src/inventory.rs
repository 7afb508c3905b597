//! Backend inventory listing and attribute collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skiff_common::{ContainerId, SkiffResult};

use crate::reference::ObjectRef;

/// Power state of a container VM as reported by the backend inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerState {
    /// The VM is powered on.
    PoweredOn,
    /// The VM is powered off.
    PoweredOff,
    /// The VM is suspended.
    Suspended,
}

/// Point-in-time descriptive attributes of one container VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// Display name of the backing VM.
    pub name: String,
    /// Raw power state reported by the backend.
    pub power_state: PowerState,
    /// Guest IP address, when the guest agent reports one.
    pub guest_ip: Option<String>,
    /// When this snapshot was collected.
    pub refreshed: DateTime<Utc>,
}

/// One container as reported by the backend inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// The container's ID.
    pub id: ContainerId,
    /// Reference to the backing VM.
    pub reference: ObjectRef,
    /// Power state at listing time.
    pub power_state: PowerState,
    /// Attributes at listing time.
    pub attributes: AttributeSnapshot,
}

/// Authoritative listing of container VMs owned by this control plane.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// List every container VM under control-plane ownership.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be queried.
    async fn list(&self) -> SkiffResult<Vec<ContainerRecord>>;
}

/// Best-effort bulk collection of a container's current attributes.
///
/// Callers bound each refresh with their own timeout; implementations are
/// expected to abandon work promptly when the driving future is dropped.
#[async_trait]
pub trait AttributeFetcher: Send + Sync {
    /// Fetch a fresh attribute snapshot for one container.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    async fn refresh(
        &self,
        id: &ContainerId,
        reference: &ObjectRef,
    ) -> SkiffResult<AttributeSnapshot>;
}
