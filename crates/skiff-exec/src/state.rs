//! Container lifecycle states and the evented transition function.

use serde::{Deserialize, Serialize};
use skiff_backend::{BackendEventKind, PowerState};

/// Container lifecycle states.
///
/// The intent states (`Starting`, `Stopping`, `Suspending`, `Removing`) are
/// written by explicit administrative operations while their backend call is
/// in flight. The observed states are confirmed by the backend, either
/// through the event stream or by an operation's own completion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Container has been created but is not yet tracked as running.
    Created,
    /// A start operation is in flight.
    Starting,
    /// Container is running.
    Running,
    /// A stop operation is in flight.
    Stopping,
    /// Container has stopped.
    Stopped,
    /// A suspend operation is in flight.
    Suspending,
    /// Container is suspended.
    Suspended,
    /// A remove operation is in flight.
    Removing,
    /// Container has been removed from the backend inventory.
    Removed,
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Suspending => write!(f, "suspending"),
            Self::Suspended => write!(f, "suspended"),
            Self::Removing => write!(f, "removing"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

impl From<PowerState> for ContainerState {
    fn from(power: PowerState) -> Self {
        match power {
            PowerState::PoweredOn => Self::Running,
            PowerState::PoweredOff => Self::Stopped,
            PowerState::Suspended => Self::Suspended,
        }
    }
}

/// Map a raw backend event onto the container's next state.
///
/// An administrative operation sets the matching intent state itself and
/// owns the final transition once its backend call completes. An event that
/// races ahead of that completion path is ignored so the operation performs
/// the authoritative transition exactly once. Once the intent state is
/// cleared, the event stream is trusted for the observed state.
///
/// Unrecognized event kinds leave the state untouched.
#[must_use]
pub fn evented_state(kind: &BackendEventKind, current: ContainerState) -> ContainerState {
    match kind {
        BackendEventKind::PoweredOn if current != ContainerState::Starting => {
            ContainerState::Running
        }
        BackendEventKind::PoweredOff if current != ContainerState::Stopping => {
            ContainerState::Stopped
        }
        BackendEventKind::Suspended if current != ContainerState::Suspending => {
            ContainerState::Suspended
        }
        BackendEventKind::Removed if current != ContainerState::Removing => ContainerState::Removed,
        _ => current,
    }
}
