//! Context - the services bound to one engine call.
//!
//! A Context is created by the [`Container`] for each call. It owns a
//! storage session and an event buffer, and once initialized, the loaded
//! business network and the facades built over it.
//!
//! ```text
//!   Container::create_context(identity)
//!        │
//!        ▼
//!   initialize ── load $sysdata.businessnetwork ── cache ──► LoadedNetwork
//!        │                                                     │
//!        │        Serializer / Factory / RegistryManager ◄─────┘
//!        │        IdentityManager / Resolver / QueryService
//!        ▼
//!   load participant for the caller (rejects revoked or inactive identities)
//! ```

use ledger_store::DataService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::Api;
use crate::cache::LoadedNetwork;
use crate::cancel::{CallToken, CancelHandle};
use crate::container::Container;
use crate::error::{IdentityRejection, Result, RuntimeError};
use crate::events::EventService;
use crate::executor::{NativeTransactionExecutor, TransactionExecutor};
use crate::factory::Factory;
use crate::identity::IdentityService;
use crate::identity_manager::{IdentityManager, SYSIDENTITIES};
use crate::model::Introspector;
use crate::query::QueryService;
use crate::registry_manager::{RegistryManager, SYSREGISTRIES};
use crate::resolver::Resolver;
use crate::resource::Resource;
use crate::serializer::Serializer;

/// Collection holding the deployed business network.
pub const SYSDATA: &str = "$sysdata";
/// Key of the archive record in [`SYSDATA`].
pub const BUSINESS_NETWORK_KEY: &str = "businessnetwork";

/// The persisted archive: `{ data, hash }`, plus an undeploy marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNetwork {
    /// Base64 archive
    pub data: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub undeployed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InitializeOptions {
    /// The caller may be ISSUED or BOUND (activateIdentity)
    pub allow_activation: bool,
    /// Reload the network and services but keep the current participant
    pub reinitialize: bool,
}

/// Facades over the loaded network, rebuilt on every initialize.
#[derive(Debug, Clone)]
struct Services {
    network: Arc<LoadedNetwork>,
    serializer: Serializer,
    factory: Factory,
    registries: RegistryManager,
    identities: IdentityManager,
}

pub struct Context {
    id: String,
    container: Container,
    data: DataService,
    events: EventService,
    identity: Arc<dyn IdentityService>,
    services: Option<Services>,
    participant: Option<Resource>,
    transaction: Option<Resource>,
    executors: HashMap<String, Arc<dyn TransactionExecutor>>,
    event_counter: Arc<AtomicU32>,
    cancel: CancelHandle,
    token: CallToken,
}

impl Context {
    pub(crate) fn new(
        container: Container,
        data: DataService,
        events: EventService,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        let native: Arc<dyn TransactionExecutor> = Arc::new(NativeTransactionExecutor);
        let mut executors = HashMap::new();
        executors.insert(native.kind().to_string(), native);
        let (cancel, token) = CallToken::pair();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            container,
            data,
            events,
            identity,
            services: None,
            participant: None,
            transaction: None,
            executors,
            event_counter: Arc::new(AtomicU32::new(0)),
            cancel,
            token,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn data_service(&self) -> &DataService {
        &self.data
    }

    pub fn event_service(&self) -> &EventService {
        &self.events
    }

    pub fn identity(&self) -> &dyn IdentityService {
        self.identity.as_ref()
    }

    /// Abandon the call this context is bound to.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub(crate) fn call_token(&self) -> CallToken {
        self.token.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.services.is_some()
    }

    /// Load the deployed network and bind the caller's participant.
    pub async fn initialize(&mut self, options: InitializeOptions) -> Result<()> {
        let sysdata = self.data.get_collection(SYSDATA).await?;
        let stored: StoredNetwork =
            serde_json::from_value(sysdata.get(BUSINESS_NETWORK_KEY).await?)?;
        if stored.undeployed {
            return Err(RuntimeError::Undeployed);
        }
        let network = self.container.load_network(&stored.hash, &stored.data).await?;
        self.bind_network(network).await?;

        if !options.reinitialize {
            self.participant = self.load_current_participant(options.allow_activation).await?;
        }
        debug!(
            context = %self.id,
            network = %self.network()?.definition.identifier(),
            participant = ?self.participant.as_ref().map(Resource::fqi),
            "Context initialized"
        );
        Ok(())
    }

    async fn bind_network(&mut self, network: Arc<LoadedNetwork>) -> Result<()> {
        let serializer = Serializer::new(network.definition.introspector());
        let factory = Factory::new(network.definition.introspector());
        let sysregistries = self.data.get_collection(SYSREGISTRIES).await?;
        let registries = RegistryManager::new(self.data.clone(), serializer.clone(), sysregistries);
        let sysidentities = self.data.get_collection(SYSIDENTITIES).await?;
        let identities = IdentityManager::new(sysidentities, registries.clone());
        self.services = Some(Services {
            network,
            serializer,
            factory,
            registries,
            identities,
        });
        Ok(())
    }

    async fn load_current_participant(&self, allow_activation: bool) -> Result<Option<Resource>> {
        let Some(identifier) = self.identity.identifier() else {
            return Ok(None);
        };
        let reject = |reason: IdentityRejection| {
            warn!(identity = %identifier, reason = ?reason, "Identity rejected");
            RuntimeError::IdentityInvalid {
                identifier: identifier.to_string(),
                reason,
            }
        };

        let identities = self.identity_manager()?;
        let record = identities
            .find_identity(self.identity.as_ref())
            .await?
            .ok_or_else(|| reject(IdentityRejection::NotRegistered))?;
        identities.validate(&record, allow_activation).map_err(reject)?;

        match identities.participant(&record).await {
            Ok(participant) => Ok(Some(participant)),
            Err(e) if e.is_not_found() => Err(reject(IdentityRejection::ParticipantMissing)),
            Err(e) => Err(e),
        }
    }

    fn services(&self) -> Result<&Services> {
        self.services.as_ref().ok_or(RuntimeError::NotInitialized)
    }

    pub fn network(&self) -> Result<&Arc<LoadedNetwork>> {
        Ok(&self.services()?.network)
    }

    pub fn introspector(&self) -> Result<Arc<Introspector>> {
        Ok(self.services()?.network.definition.introspector())
    }

    pub fn serializer(&self) -> Result<&Serializer> {
        Ok(&self.services()?.serializer)
    }

    pub fn factory(&self) -> Result<&Factory> {
        Ok(&self.services()?.factory)
    }

    pub fn registry_manager(&self) -> Result<&RegistryManager> {
        Ok(&self.services()?.registries)
    }

    pub fn identity_manager(&self) -> Result<&IdentityManager> {
        Ok(&self.services()?.identities)
    }

    pub fn resolver(&self) -> Result<Resolver> {
        Ok(Resolver::new(self.registry_manager()?.clone()))
    }

    pub fn query_service(&self) -> Result<QueryService> {
        Ok(QueryService::new(self.registry_manager()?.clone()))
    }

    pub fn participant(&self) -> Option<&Resource> {
        self.participant.as_ref()
    }

    pub fn transaction(&self) -> Option<&Resource> {
        self.transaction.as_ref()
    }

    /// Set the transaction being processed; only valid once per call.
    pub fn set_transaction(&mut self, transaction: Resource) -> Result<()> {
        if self.transaction.is_some() {
            return Err(RuntimeError::Resource(
                "A current transaction has already been specified".into(),
            ));
        }
        self.transaction = Some(transaction);
        Ok(())
    }

    pub fn executor(&self, kind: &str) -> Option<Arc<dyn TransactionExecutor>> {
        self.executors.get(kind).cloned()
    }

    /// The capability bundle for transaction processors.
    pub fn api(&self) -> Result<Api> {
        let services = self.services()?;
        Ok(Api::new(
            services.factory.clone(),
            services.registries.clone(),
            self.events.clone(),
            self.participant.clone(),
            self.transaction.clone(),
            self.event_counter.clone(),
        ))
    }

    pub async fn transaction_start(&self, read_only: bool) -> Result<()> {
        self.data.transaction_start(read_only).await?;
        self.events.transaction_start(read_only).await
    }

    pub async fn transaction_prepare(&self) -> Result<()> {
        self.data.transaction_prepare().await?;
        self.events.transaction_prepare().await
    }

    pub async fn transaction_commit(&self) -> Result<()> {
        self.data.transaction_commit().await?;
        self.events.transaction_commit().await
    }

    pub async fn transaction_rollback(&self) -> Result<()> {
        self.data.transaction_rollback().await?;
        self.events.transaction_rollback().await
    }

    pub async fn transaction_end(&self) -> Result<()> {
        self.data.transaction_end().await?;
        self.events.transaction_end().await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("initialized", &self.is_initialized())
            .field("participant", &self.participant.as_ref().map(Resource::fqi))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerConfig;
    use crate::identity::AnonymousIdentity;

    #[tokio::test]
    async fn test_accessors_require_initialize() {
        let container = Container::new(ContainerConfig::new("ctx-test")).unwrap();
        let context = container.create_context(Arc::new(AnonymousIdentity));
        assert!(!context.is_initialized());
        assert!(matches!(context.registry_manager(), Err(RuntimeError::NotInitialized)));
        assert!(matches!(context.api(), Err(RuntimeError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_initialize_without_deployment_fails() {
        let container = Container::new(ContainerConfig::new("ctx-test")).unwrap();
        let mut context = container.create_context(Arc::new(AnonymousIdentity));
        let err = context
            .initialize(InitializeOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transaction_set_once() {
        let container = Container::new(ContainerConfig::new("ctx-test")).unwrap();
        let mut context = container.create_context(Arc::new(AnonymousIdentity));
        let tx = Resource::new("org.acme.Trade", "t1").unwrap();
        context.set_transaction(tx.clone()).unwrap();
        assert!(context.set_transaction(tx).is_err());
    }

    #[test]
    fn test_stored_network_shape() {
        let stored = StoredNetwork {
            data: "UEsDBA==".into(),
            hash: "abc".into(),
            undeployed: false,
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json, serde_json::json!({ "data": "UEsDBA==", "hash": "abc" }));
    }
}
