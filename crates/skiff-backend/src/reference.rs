//! Typed references to managed objects on the virtualization backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of managed object a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    /// A container virtual machine.
    VirtualMachine,
    /// A resource pool.
    ResourcePool,
    /// A virtual application (a managed group of VMs with its own pool).
    VirtualApp,
    /// A network endpoint.
    Network,
    /// A cluster or standalone host compute resource.
    ComputeResource,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VirtualMachine => write!(f, "vm"),
            Self::ResourcePool => write!(f, "pool"),
            Self::VirtualApp => write!(f, "vapp"),
            Self::Network => write!(f, "network"),
            Self::ComputeResource => write!(f, "compute"),
        }
    }
}

/// An opaque reference to a managed object on the backend.
///
/// References are stable identifiers assigned by the backend inventory and
/// are valid for the lifetime of the managed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// The kind of object referenced.
    pub kind: ObjectKind,
    /// The backend-assigned identifier.
    pub value: String,
}

impl ObjectRef {
    /// Create a new reference.
    #[must_use]
    pub fn new(kind: ObjectKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Reference to a container virtual machine.
    #[must_use]
    pub fn virtual_machine(value: impl Into<String>) -> Self {
        Self::new(ObjectKind::VirtualMachine, value)
    }

    /// Reference to a resource pool.
    #[must_use]
    pub fn resource_pool(value: impl Into<String>) -> Self {
        Self::new(ObjectKind::ResourcePool, value)
    }

    /// Reference to a network endpoint.
    #[must_use]
    pub fn network(value: impl Into<String>) -> Self {
        Self::new(ObjectKind::Network, value)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// A reference resolved to its concrete backend object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedRef {
    /// A resource pool.
    ResourcePool(ObjectRef),
    /// A virtual application together with its owning resource pool.
    VirtualApp {
        /// The virtual application itself.
        app: ObjectRef,
        /// The resource pool the application schedules into.
        pool: ObjectRef,
    },
    /// A network endpoint.
    Network(ObjectRef),
}

impl TypedRef {
    /// The underlying reference, regardless of resolved type.
    #[must_use]
    pub const fn as_ref(&self) -> &ObjectRef {
        match self {
            Self::ResourcePool(r) | Self::Network(r) => r,
            Self::VirtualApp { app, .. } => app,
        }
    }
}
