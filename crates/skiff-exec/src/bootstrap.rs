//! One-shot bootstrap of the lifecycle synchronizer.

use std::sync::Arc;

use skiff_backend::{
    AttributeFetcher, EventSource, Inventory, ObjectRef, ResourceResolver, Session, TypedRef,
};
use skiff_common::{SkiffError, SkiffResult};
use tokio::sync::OnceCell;

use crate::cache::ContainerCache;
use crate::config::{CLIENT_NETWORK, ConfigSource, ExecConfig};
use crate::dispatcher::Dispatcher;
use crate::events::EventManager;

/// Collaborator handles the bootstrap wires together.
#[derive(Clone)]
pub struct BackendHandles {
    /// Typed reference resolution.
    pub resolver: Arc<dyn ResourceResolver>,
    /// The raw backend event stream.
    pub source: Arc<dyn EventSource>,
    /// Best-effort attribute collection.
    pub fetcher: Arc<dyn AttributeFetcher>,
    /// Authoritative container listing.
    pub inventory: Arc<dyn Inventory>,
}

impl std::fmt::Debug for BackendHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandles")
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

/// Resolved placement for scheduled containers.
#[derive(Debug, Clone)]
pub struct Placement {
    /// The resource pool containers schedule into.
    pub resource_pool: ObjectRef,
    /// The owning virtual application, when the compute resource resolved
    /// to one.
    pub virtual_app: Option<ObjectRef>,
}

/// The running lifecycle synchronizer.
///
/// Constructed once by [`Bootstrap::init`]; read access to the container
/// cache and the event manager is shared with the rest of the control
/// plane.
#[derive(Debug)]
pub struct Synchronizer {
    pub(crate) config: ExecConfig,
    pub(crate) placement: Placement,
    pub(crate) client_network: ObjectRef,
    pub(crate) session: Session,
    pub(crate) cache: Arc<ContainerCache>,
    pub(crate) events: Arc<EventManager>,
}

impl Synchronizer {
    /// The decoded execution configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Resolved container placement.
    #[must_use]
    pub const fn placement(&self) -> &Placement {
        &self.placement
    }

    /// The auxiliary client network used for internal bookkeeping.
    #[must_use]
    pub const fn client_network(&self) -> &ObjectRef {
        &self.client_network
    }

    /// The backend session, carrying host metadata and capacity.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The container cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ContainerCache> {
        &self.cache
    }

    /// The event manager.
    #[must_use]
    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }
}

/// Exactly-once bootstrap gate.
///
/// The first caller executes the full initialization sequence; every
/// concurrent or later caller blocks until it completes and receives the
/// same memoized result, error or success. A failed bootstrap is never
/// retried through the same gate.
#[derive(Debug, Default)]
pub struct Bootstrap {
    cell: OnceCell<Result<Arc<Synchronizer>, SkiffError>>,
}

impl Bootstrap {
    /// Create an unfired gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the one-time initialization, or replay its memoized outcome.
    ///
    /// # Errors
    ///
    /// Returns the first attempt's bootstrap error, permanently.
    pub async fn init(
        &self,
        session: &Session,
        handles: &BackendHandles,
        source: &dyn ConfigSource,
    ) -> SkiffResult<Arc<Synchronizer>> {
        self.cell
            .get_or_init(|| bootstrap(session, handles, source))
            .await
            .clone()
    }

    /// The memoized outcome, if the gate has fired.
    #[must_use]
    pub fn get(&self) -> Option<&Result<Arc<Synchronizer>, SkiffError>> {
        self.cell.get()
    }
}

/// The full initialization sequence. Any failure aborts the remaining
/// steps and becomes the gate's permanent outcome.
async fn bootstrap(
    session: &Session,
    handles: &BackendHandles,
    source: &dyn ConfigSource,
) -> Result<Arc<Synchronizer>, SkiffError> {
    let config = source.decode()?;
    tracing::debug!(
        compute_resources = config.compute_resources.len(),
        networks = config.networks.len(),
        "Decoded execution config"
    );

    let count = config.compute_resources.len();
    if count != 1 {
        let error = SkiffError::SingularComputeResource { found: count };
        tracing::error!(%error, "Bootstrap failed");
        return Err(error);
    }

    let compute = &config.compute_resources[0];
    let placement = match handles.resolver.resolve(compute).await? {
        TypedRef::VirtualApp { app, pool } => Placement {
            resource_pool: pool,
            virtual_app: Some(app),
        },
        TypedRef::ResourcePool(pool) => Placement {
            resource_pool: pool,
            virtual_app: None,
        },
        TypedRef::Network(_) => {
            let error = SkiffError::UnsupportedReference {
                reference: compute.to_string(),
            };
            tracing::error!(%error, "Bootstrap failed");
            return Err(error);
        }
    };

    // Monitor the cluster the session is connected to; standalone hosts
    // surface as a single-host compute resource.
    tracing::debug!(cluster = %session.cluster(), "Starting backend event stream");
    let events = EventManager::new(Arc::clone(&handles.source));
    events.start().await?;

    let cache = Arc::new(ContainerCache::new());
    let dispatcher = Dispatcher::new(
        Arc::clone(&cache),
        Arc::clone(&events),
        Arc::clone(&handles.fetcher),
    );
    dispatcher.subscribe();

    let endpoint = config
        .networks
        .get(CLIENT_NETWORK)
        .ok_or_else(|| SkiffError::MissingNetwork {
            name: CLIENT_NETWORK.to_string(),
        })?;
    let client_network = match handles.resolver.resolve(&endpoint.network).await? {
        TypedRef::Network(reference) => reference,
        other => {
            return Err(SkiffError::UnsupportedReference {
                reference: other.as_ref().to_string(),
            });
        }
    };

    let about = session.about();
    let capacity = session.capacity();
    tracing::debug!(
        os = %about.os_type,
        version = %about.version,
        product = %about.product_name,
        "Host platform"
    );
    tracing::debug!(
        cpu_mhz = capacity.cpu_mhz,
        memory_bytes = capacity.memory_bytes,
        cpu_limit = ?config.cpu_limit,
        memory_limit = ?config.memory_limit,
        "Host capacity"
    );

    cache.sync(handles.inventory.as_ref()).await?;

    Ok(Arc::new(Synchronizer {
        config,
        placement,
        client_network,
        session: session.clone(),
        cache,
        events,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use skiff_backend::{
        AboutInfo, AttributeSnapshot, ContainerRecord, EventSink, HostCapacity, ObjectKind,
        PowerState,
    };
    use skiff_common::ContainerId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::{JsonConfigSource, NetworkEndpoint};
    use crate::state::ContainerState;

    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceResolver for CountingResolver {
        async fn resolve(&self, reference: &ObjectRef) -> SkiffResult<TypedRef> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match reference.kind {
                ObjectKind::ResourcePool => Ok(TypedRef::ResourcePool(reference.clone())),
                ObjectKind::VirtualApp => Ok(TypedRef::VirtualApp {
                    app: reference.clone(),
                    pool: ObjectRef::resource_pool(format!("{}-pool", reference.value)),
                }),
                ObjectKind::Network => Ok(TypedRef::Network(reference.clone())),
                _ => Err(SkiffError::ReferenceResolution {
                    reference: reference.to_string(),
                    reason: "no such object".to_string(),
                }),
            }
        }
    }

    struct ScriptedSource {
        sink: Mutex<Option<EventSink>>,
        fail: bool,
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted collector"
        }

        async fn start(&self, sink: EventSink) -> SkiffResult<()> {
            if self.fail {
                return Err(SkiffError::Backend {
                    message: "connection refused".to_string(),
                });
            }
            *self.sink.lock() = Some(sink);
            Ok(())
        }
    }

    struct OkFetcher;

    #[async_trait]
    impl AttributeFetcher for OkFetcher {
        async fn refresh(
            &self,
            id: &ContainerId,
            _reference: &ObjectRef,
        ) -> SkiffResult<AttributeSnapshot> {
            Ok(AttributeSnapshot {
                name: id.to_string(),
                power_state: PowerState::PoweredOn,
                guest_ip: None,
                refreshed: Utc::now(),
            })
        }
    }

    struct FixedInventory(Vec<ContainerRecord>);

    #[async_trait]
    impl Inventory for FixedInventory {
        async fn list(&self) -> SkiffResult<Vec<ContainerRecord>> {
            Ok(self.0.clone())
        }
    }

    fn record(id: &str, vm: &str, power: PowerState) -> ContainerRecord {
        ContainerRecord {
            id: ContainerId::new(id).unwrap(),
            reference: ObjectRef::virtual_machine(vm),
            power_state: power,
            attributes: AttributeSnapshot {
                name: id.to_string(),
                power_state: power,
                guest_ip: None,
                refreshed: Utc::now(),
            },
        }
    }

    fn session() -> Session {
        Session::new(
            "https://backend.local",
            ObjectRef::new(ObjectKind::ComputeResource, "cluster-1"),
            AboutInfo {
                os_type: "linux".to_string(),
                version: "8.0".to_string(),
                product_name: "hypervisor".to_string(),
            },
            HostCapacity {
                cpu_mhz: 24_000,
                memory_bytes: 64 << 30,
            },
        )
    }

    fn handles(resolver: Arc<CountingResolver>, records: Vec<ContainerRecord>) -> BackendHandles {
        BackendHandles {
            resolver,
            source: Arc::new(ScriptedSource {
                sink: Mutex::new(None),
                fail: false,
            }),
            fetcher: Arc::new(OkFetcher),
            inventory: Arc::new(FixedInventory(records)),
        }
    }

    fn config(compute: &[ObjectRef]) -> ExecConfig {
        let mut networks = HashMap::new();
        networks.insert(
            CLIENT_NETWORK.to_string(),
            NetworkEndpoint {
                name: CLIENT_NETWORK.to_string(),
                network: ObjectRef::network("net-client"),
            },
        );
        ExecConfig {
            compute_resources: compute.to_vec(),
            networks,
            cpu_limit: None,
            memory_limit: None,
        }
    }

    struct FixedConfig(ExecConfig);

    impl ConfigSource for FixedConfig {
        fn decode(&self) -> SkiffResult<ExecConfig> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn bootstrap_resolves_and_syncs() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let handles = handles(
            Arc::clone(&resolver),
            vec![record("web-1", "vm-1", PowerState::PoweredOn)],
        );
        let gate = Bootstrap::new();

        let sync = gate
            .init(
                &session(),
                &handles,
                &FixedConfig(config(&[ObjectRef::resource_pool("pool-1")])),
            )
            .await
            .unwrap();

        assert_eq!(sync.placement().resource_pool.value, "pool-1");
        assert!(sync.placement().virtual_app.is_none());
        assert_eq!(sync.client_network().value, "net-client");
        assert_eq!(sync.cache().len(), 1);
        assert_eq!(
            sync.cache()
                .get(&ContainerId::new("web-1").unwrap())
                .unwrap()
                .state(),
            ContainerState::Running
        );
        // Compute resource plus client network.
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn virtual_app_carries_its_pool() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let handles = handles(Arc::clone(&resolver), Vec::new());
        let gate = Bootstrap::new();

        let sync = gate
            .init(
                &session(),
                &handles,
                &FixedConfig(config(&[ObjectRef::new(ObjectKind::VirtualApp, "vapp-1")])),
            )
            .await
            .unwrap();

        assert_eq!(sync.placement().resource_pool.value, "vapp-1-pool");
        assert_eq!(
            sync.placement().virtual_app.as_ref().unwrap().value,
            "vapp-1"
        );
    }

    #[tokio::test]
    async fn non_singular_compute_resource_fails() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let handles = handles(Arc::clone(&resolver), Vec::new());
        let gate = Bootstrap::new();
        let pools = [
            ObjectRef::resource_pool("pool-1"),
            ObjectRef::resource_pool("pool-2"),
        ];

        let err = gate
            .init(&session(), &handles, &FixedConfig(config(&pools)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SkiffError::SingularComputeResource { found: 2 }
        ));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_is_memoized_across_callers() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let handles = handles(Arc::clone(&resolver), Vec::new());
        let gate = Bootstrap::new();
        // A VM reference is not a valid compute resource; resolution fails.
        let source = FixedConfig(config(&[ObjectRef::virtual_machine("vm-1")]));
        let sess = session();

        let (first, second) = tokio::join!(
            gate.init(&sess, &handles, &source),
            gate.init(&sess, &handles, &source)
        );
        let third = gate.init(&sess, &handles, &source).await;

        for outcome in [first, second, third] {
            assert!(matches!(
                outcome.unwrap_err(),
                SkiffError::ReferenceResolution { .. }
            ));
        }
        // The sequence ran once; no retry after the memoized failure.
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn event_source_start_failure_is_fatal() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let handles = BackendHandles {
            resolver,
            source: Arc::new(ScriptedSource {
                sink: Mutex::new(None),
                fail: true,
            }),
            fetcher: Arc::new(OkFetcher),
            inventory: Arc::new(FixedInventory(Vec::new())),
        };
        let gate = Bootstrap::new();

        let err = gate
            .init(
                &session(),
                &handles,
                &FixedConfig(config(&[ObjectRef::resource_pool("pool-1")])),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SkiffError::EventSource { .. }));
        assert_eq!(err.to_string(), "scripted collector failed to start: Backend error: connection refused");
    }

    #[tokio::test]
    async fn missing_client_network_is_fatal() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let handles = handles(Arc::clone(&resolver), Vec::new());
        let gate = Bootstrap::new();

        let mut cfg = config(&[ObjectRef::resource_pool("pool-1")]);
        cfg.networks.clear();

        let err = gate
            .init(&session(), &handles, &FixedConfig(cfg))
            .await
            .unwrap_err();

        assert!(matches!(err, SkiffError::MissingNetwork { .. }));
    }
}
