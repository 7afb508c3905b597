//! Raw lifecycle events emitted by the backend and the source that
//! delivers them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skiff_common::SkiffResult;
use tokio::sync::mpsc;

use crate::reference::ObjectRef;

/// Kind of raw power/lifecycle event emitted by the backend.
///
/// The synchronizer reacts to the power transitions; the remaining kinds
/// flow through the stream but are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendEventKind {
    /// The VM finished powering on.
    PoweredOn,
    /// The VM finished powering off.
    PoweredOff,
    /// The VM was suspended.
    Suspended,
    /// The VM was removed from the backend inventory.
    Removed,
    /// The VM was relocated to another host.
    Relocated,
    /// The VM was renamed in the inventory.
    Renamed,
    /// Any other event kind carried by the stream.
    #[serde(untagged)]
    Other(String),
}

impl BackendEventKind {
    /// The event kind as a display string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PoweredOn => "powered on",
            Self::PoweredOff => "powered off",
            Self::Suspended => "suspended",
            Self::Removed => "removed",
            Self::Relocated => "relocated",
            Self::Renamed => "renamed",
            Self::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for BackendEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw event from the backend event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEvent {
    /// The managed object the event concerns.
    pub subject: ObjectRef,
    /// What happened.
    pub kind: BackendEventKind,
    /// When the backend recorded the event.
    pub created: DateTime<Utc>,
}

impl BackendEvent {
    /// Create a new event.
    #[must_use]
    pub const fn new(subject: ObjectRef, kind: BackendEventKind, created: DateTime<Utc>) -> Self {
        Self {
            subject,
            kind,
            created,
        }
    }
}

/// Sink an event source delivers into.
pub type EventSink = mpsc::UnboundedSender<BackendEvent>;

/// A source of raw backend events.
///
/// Implementations poll or subscribe to the backend's native event stream
/// and forward every event into the sink, in the order the backend reports
/// them, until the process exits.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Name of this source, for diagnostics.
    fn name(&self) -> &str;

    /// Begin delivering events into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream cannot be established.
    async fn start(&self, sink: EventSink) -> SkiffResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(BackendEventKind::PoweredOn.to_string(), "powered on");
        assert_eq!(
            BackendEventKind::Other("reconfigured".to_string()).to_string(),
            "reconfigured"
        );
    }
}
