//! The capability bundle handed to transaction processors.

use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{Result, RuntimeError};
use crate::events::EventService;
use crate::factory::Factory;
use crate::model::DeclarationKind;
use crate::registry::{Registry, RegistryType, WriteOptions};
use crate::registry_manager::RegistryManager;
use crate::resource::Resource;
use crate::serializer::{SerializeOptions, Serializer};

/// What a transaction processor may do.
#[derive(Debug, Clone)]
pub struct Api {
    factory: Factory,
    serializer: Serializer,
    registries: RegistryManager,
    events: EventService,
    participant: Option<Resource>,
    transaction: Option<Resource>,
    event_counter: Arc<AtomicU32>,
}

impl Api {
    pub(crate) fn new(
        factory: Factory,
        registries: RegistryManager,
        events: EventService,
        participant: Option<Resource>,
        transaction: Option<Resource>,
        event_counter: Arc<AtomicU32>,
    ) -> Self {
        Self {
            factory,
            serializer: registries.serializer().clone(),
            registries,
            events,
            participant,
            transaction,
            event_counter,
        }
    }

    pub fn get_factory(&self) -> &Factory {
        &self.factory
    }

    pub fn get_serializer(&self) -> &Serializer {
        &self.serializer
    }

    pub fn get_current_participant(&self) -> Option<&Resource> {
        self.participant.as_ref()
    }

    pub fn get_transaction(&self) -> Option<&Resource> {
        self.transaction.as_ref()
    }

    /// The default registry for an asset type.
    pub async fn get_asset_registry(&self, fqn: &str) -> Result<ApiRegistry> {
        self.registry(RegistryType::Asset, fqn).await
    }

    /// The default registry for a participant type.
    pub async fn get_participant_registry(&self, fqn: &str) -> Result<ApiRegistry> {
        self.registry(RegistryType::Participant, fqn).await
    }

    async fn registry(&self, registry_type: RegistryType, id: &str) -> Result<ApiRegistry> {
        Ok(ApiRegistry {
            registry: self.registries.get(registry_type, id).await?,
        })
    }

    /// Queue an event for publication when the transaction commits.
    pub async fn emit(&self, mut event: Resource) -> Result<()> {
        let declaration = self.serializer.introspector().get(&event.fqn())?;
        if declaration.kind != DeclarationKind::Event {
            return Err(RuntimeError::Resource(format!(
                "Cannot emit {} {}",
                declaration.kind,
                event.fqn()
            )));
        }

        let number = self.event_counter.fetch_add(1, Ordering::SeqCst);
        let transaction_id = self
            .transaction
            .as_ref()
            .map(|tx| tx.identifier.as_str())
            .unwrap_or_default();
        event.identifier = format!("{transaction_id}#{number}");
        if let Some(field) = &declaration.identified_by {
            event.set(field.clone(), Value::String(event.identifier.clone()));
        }

        let json = self
            .serializer
            .to_json(&event, SerializeOptions::converting())?;
        self.events.emit(json).await
    }
}

/// A registry as seen by transaction processors: nested resources are
/// always stored as relationships.
#[derive(Debug, Clone)]
pub struct ApiRegistry {
    registry: Registry,
}

impl ApiRegistry {
    const WRITE: WriteOptions = WriteOptions {
        convert_resources_to_relationships: true,
        force: false,
    };

    pub fn id(&self) -> &str {
        self.registry.id()
    }

    pub async fn get_all(&self) -> Result<Vec<Resource>> {
        self.registry.get_all().await
    }

    pub async fn get(&self, id: &str) -> Result<Resource> {
        self.registry.get(id).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.registry.exists(id).await
    }

    pub async fn add(&self, resource: &Resource) -> Result<()> {
        self.registry.add(resource, Self::WRITE).await
    }

    pub async fn add_all(&self, resources: &[Resource]) -> Result<()> {
        self.registry.add_all(resources, Self::WRITE).await
    }

    pub async fn update(&self, resource: &Resource) -> Result<()> {
        self.registry.update(resource, Self::WRITE).await
    }

    pub async fn update_all(&self, resources: &[Resource]) -> Result<()> {
        self.registry.update_all(resources, Self::WRITE).await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.registry.remove(id).await
    }

    pub async fn remove_all(&self, ids: &[String]) -> Result<()> {
        self.registry.remove_all(ids).await
    }
}
