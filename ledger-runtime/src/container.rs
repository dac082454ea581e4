//! Container - the long-lived host of the runtime.
//!
//! One Container owns the single [`DataService`] every call shares, the
//! logging service, the definition cache, the processor table and the
//! event channel. Contexts are cheap per-call views over it.

use ledger_store::{DataService, DataServiceOptions, FsBackend, MemoryBackend, SledBackend, StorageBackend};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::archive::BusinessNetworkDefinition;
use crate::cache::{CacheStats, LoadedNetwork, NetworkCache};
use crate::config::{ContainerConfig, StorageConfig};
use crate::context::Context;
use crate::error::Result;
use crate::events::EventService;
use crate::executor::{CompiledScriptBundle, ProcessorTable, TransactionProcessor};
use crate::identity::IdentityService;
use crate::logging::LoggingService;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct ContainerInner {
    config: ContainerConfig,
    data_service: DataService,
    logging: LoggingService,
    cache: Mutex<NetworkCache>,
    processors: ProcessorTable,
    events: broadcast::Sender<Value>,
}

#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Build a container and the storage backend its config names.
    /// Must be called from within a tokio runtime.
    pub fn new(config: ContainerConfig) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.storage {
            StorageConfig::Memory => Arc::new(MemoryBackend::new()),
            StorageConfig::Sled(sled) => Arc::new(SledBackend::new(sled.clone())),
            StorageConfig::Filesystem { root } => Arc::new(FsBackend::new(root)),
        };
        let data_service = DataService::new(
            backend,
            DataServiceOptions {
                autocommit: config.autocommit,
                ..Default::default()
            },
        );
        let logging = LoggingService::install(&config.log_level)?;
        Ok(Self::with_services(config, data_service, logging))
    }

    /// Build a container over an existing data service, e.g. one with a
    /// custom backend, or with an installed logging service.
    pub fn with_services(
        config: ContainerConfig,
        data_service: DataService,
        logging: LoggingService,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            container = %config.container_id,
            version = %config.version,
            backend = data_service.backend_name(),
            "Container created"
        );
        Self {
            inner: Arc::new(ContainerInner {
                cache: Mutex::new(NetworkCache::new(config.definition_cache_capacity)),
                config,
                data_service,
                logging,
                processors: ProcessorTable::new(),
                events,
            }),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn id(&self) -> &str {
        &self.inner.config.container_id
    }

    pub fn version(&self) -> &str {
        &self.inner.config.version
    }

    pub fn data_service(&self) -> &DataService {
        &self.inner.data_service
    }

    pub fn logging_service(&self) -> &LoggingService {
        &self.inner.logging
    }

    pub fn processors(&self) -> &ProcessorTable {
        &self.inner.processors
    }

    /// Register the implementation of a script function. Cached networks
    /// are dropped so the next load binds it.
    pub async fn register_processor(&self, function: &str, processor: Arc<dyn TransactionProcessor>) {
        self.inner.processors.register(function, processor);
        self.inner.cache.lock().await.clear();
        debug!(function = %function, "Transaction processor registered");
    }

    /// Events published by committed calls.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Value> {
        self.inner.events.subscribe()
    }

    /// A fresh per-call context for `identity`.
    pub fn create_context(&self, identity: Arc<dyn IdentityService>) -> Context {
        Context::new(
            self.clone(),
            self.inner.data_service.session(),
            EventService::new(self.inner.events.clone()),
            identity,
        )
    }

    /// The parsed network for an archive, from the cache when possible.
    pub async fn load_network(&self, hash: &str, encoded: &str) -> Result<Arc<LoadedNetwork>> {
        if let Some(network) = self.inner.cache.lock().await.get(hash) {
            return Ok(network);
        }

        // parse outside the lock; a concurrent load of the same hash just
        // replaces an identical entry
        let definition = BusinessNetworkDefinition::from_base64(encoded)?;
        let scripts = CompiledScriptBundle::compile(definition.scripts(), &self.inner.processors);
        let network = Arc::new(LoadedNetwork {
            hash: hash.to_string(),
            definition: Arc::new(definition),
            scripts: Arc::new(scripts),
        });
        info!(
            network = %network.definition.identifier(),
            hash = %hash,
            "Business network loaded"
        );
        self.inner.cache.lock().await.put(network.clone());
        Ok(network)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.inner.cache.lock().await.stats()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("version", &self.version())
            .field("backend", &self.inner.data_service.backend_name())
            .finish()
    }
}
