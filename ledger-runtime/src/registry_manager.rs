//! RegistryManager - creates, finds and removes registries.
//!
//! Every registry has an entry in the `$sysregistries` collection, keyed
//! `{type}:{id}`, and a backing collection with the same ID.

use ledger_store::{DataCollection, DataService};
use tracing::{debug, info};

use crate::error::{Result, RuntimeError};
use crate::model::DeclarationKind;
use crate::registry::{Registry, RegistryRecord, RegistryType};
use crate::serializer::Serializer;

pub const SYSREGISTRIES: &str = "$sysregistries";
/// ID of the implicit transaction registry.
pub const DEFAULT_TRANSACTION_REGISTRY: &str = "default";

#[derive(Debug, Clone)]
pub struct RegistryManager {
    data_service: DataService,
    serializer: Serializer,
    sysregistries: DataCollection,
}

impl RegistryManager {
    pub fn new(data_service: DataService, serializer: Serializer, sysregistries: DataCollection) -> Self {
        Self {
            data_service,
            serializer,
            sysregistries,
        }
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    /// Every registry of one type, in `$sysregistries` order.
    pub async fn get_all(&self, registry_type: RegistryType) -> Result<Vec<Registry>> {
        let mut registries = Vec::new();
        for record in self.records().await? {
            if record.registry_type == registry_type {
                registries.push(self.open(record).await?);
            }
        }
        Ok(registries)
    }

    /// Every `$sysregistries` entry.
    pub async fn records(&self) -> Result<Vec<RegistryRecord>> {
        self.sysregistries
            .get_all()
            .await?
            .into_iter()
            .map(|object| serde_json::from_value(object).map_err(RuntimeError::from))
            .collect()
    }

    pub async fn get(&self, registry_type: RegistryType, id: &str) -> Result<Registry> {
        let object = self
            .sysregistries
            .get(&registry_type.collection_id(id))
            .await?;
        self.open(serde_json::from_value(object)?).await
    }

    pub async fn exists(&self, registry_type: RegistryType, id: &str) -> Result<bool> {
        Ok(self
            .sysregistries
            .exists(&registry_type.collection_id(id))
            .await?)
    }

    /// Register a registry and create its collection. With `force`, an
    /// existing entry and collection are reused.
    pub async fn add(
        &self,
        registry_type: RegistryType,
        id: &str,
        name: &str,
        force: bool,
    ) -> Result<Registry> {
        let record = RegistryRecord {
            registry_type,
            registry_id: id.to_string(),
            name: name.to_string(),
        };
        let key = record.collection_id();
        self.sysregistries
            .add(&key, serde_json::to_value(&record)?, force)
            .await?;
        let collection = self.data_service.create_collection(&key, force).await?;
        info!(registry = %key, name = %name, "Registry added");
        Ok(Registry::new(record, collection, self.serializer.clone()))
    }

    /// Get the registry, adding it when it does not exist.
    pub async fn ensure(&self, registry_type: RegistryType, id: &str, name: &str) -> Result<Registry> {
        match self.get(registry_type, id).await {
            Ok(registry) => Ok(registry),
            Err(e) if e.is_not_found() => self.add(registry_type, id, name, false).await,
            Err(e) => Err(e),
        }
    }

    /// Delete the backing collection, then the `$sysregistries` entry.
    pub async fn remove(&self, registry_type: RegistryType, id: &str) -> Result<()> {
        let key = registry_type.collection_id(id);
        self.data_service.delete_collection(&key).await?;
        self.sysregistries.remove(&key).await?;
        info!(registry = %key, "Registry removed");
        Ok(())
    }

    /// One registry per concrete asset, participant and transaction type,
    /// named after the type. With `force`, existing registries are reused
    /// without a lookup.
    pub async fn create_defaults(&self, force: bool) -> Result<()> {
        let introspector = self.serializer.introspector();
        let mut created = 0usize;
        for kind in [
            DeclarationKind::Asset,
            DeclarationKind::Participant,
            DeclarationKind::Transaction,
        ] {
            let Some(registry_type) = RegistryType::for_kind(kind) else {
                continue;
            };
            for declaration in introspector.concrete(kind) {
                let fqn = declaration.fqn();
                let name = format!("{} registry for {}", registry_type, fqn);
                if force {
                    self.add(registry_type, &fqn, &name, true).await?;
                } else {
                    self.ensure(registry_type, &fqn, &name).await?;
                }
                created += 1;
            }
        }
        debug!(count = created, force, "Default registries ensured");
        Ok(())
    }

    async fn open(&self, record: RegistryRecord) -> Result<Registry> {
        let collection = self
            .data_service
            .get_collection(&record.collection_id())
            .await?;
        Ok(Registry::new(record, collection, self.serializer.clone()))
    }
}
