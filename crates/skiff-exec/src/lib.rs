//! # skiff-exec
//!
//! Event-driven container lifecycle synchronizer.
//!
//! The synchronizer keeps an in-memory cache of container state consistent
//! with the asynchronous power events the virtualization backend emits,
//! normalizes those events into the control plane's own lifecycle
//! vocabulary, fans them out to subscribers, and offers a blocking wait for
//! callers awaiting a stopped container.
//!
//! Bootstrap is one-shot: the first call to [`Bootstrap::init`] resolves the
//! configured compute resource, starts the backend event stream, wires the
//! dispatcher to it, and syncs the [`ContainerCache`] from the backend
//! inventory. Every later call observes the same memoized outcome.

#![warn(missing_docs)]

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod container;
pub mod events;
pub mod state;

mod dispatcher;
mod wait;

pub use bootstrap::{BackendHandles, Bootstrap, Placement, Synchronizer};
pub use cache::ContainerCache;
pub use config::{CLIENT_NETWORK, ConfigSource, ExecConfig, JsonConfigSource, NetworkEndpoint};
pub use container::Container;
pub use events::{Event, EventCallback, EventManager, LifecycleEvent, LifecycleEventKind, Topic};
pub use state::{ContainerState, evented_state};
