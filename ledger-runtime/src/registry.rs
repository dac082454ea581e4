//! Registry - a typed view of one collection of resources.
//!
//! Objects are stored with two internal properties, `$registryType` and
//! `$registryId`, which are stripped again on read.

use ledger_store::DataCollection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{Result, RuntimeError};
use crate::model::DeclarationKind;
use crate::resource::Resource;
use crate::serializer::{SerializeOptions, Serializer, REGISTRY_ID_FIELD, REGISTRY_TYPE_FIELD};

/// The kind of resource a registry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryType {
    Asset,
    Participant,
    Transaction,
}

impl RegistryType {
    pub const ALL: [RegistryType; 3] = [
        RegistryType::Asset,
        RegistryType::Participant,
        RegistryType::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::Asset => "Asset",
            RegistryType::Participant => "Participant",
            RegistryType::Transaction => "Transaction",
        }
    }

    /// Registry type that stores instances of a declaration kind.
    pub fn for_kind(kind: DeclarationKind) -> Option<Self> {
        match kind {
            DeclarationKind::Asset => Some(RegistryType::Asset),
            DeclarationKind::Participant => Some(RegistryType::Participant),
            DeclarationKind::Transaction => Some(RegistryType::Transaction),
            DeclarationKind::Event | DeclarationKind::Concept => None,
        }
    }

    /// Backing collection ID, `{type}:{id}`.
    pub fn collection_id(&self, registry_id: &str) -> String {
        format!("{}:{}", self.as_str(), registry_id)
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryType {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RuntimeError::Resource(format!("Unknown registry type '{s}'")))
    }
}

/// An entry of the `$sysregistries` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    #[serde(rename = "type")]
    pub registry_type: RegistryType,
    pub registry_id: String,
    pub name: String,
}

impl RegistryRecord {
    pub fn collection_id(&self) -> String {
        self.registry_type.collection_id(&self.registry_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub convert_resources_to_relationships: bool,
    /// Overwrite an existing resource on add.
    pub force: bool,
}

/// Anything that names a resource in a registry.
pub trait ResourceKey {
    fn resource_id(&self) -> &str;
}

impl ResourceKey for str {
    fn resource_id(&self) -> &str {
        self
    }
}

impl ResourceKey for String {
    fn resource_id(&self) -> &str {
        self
    }
}

impl ResourceKey for Resource {
    fn resource_id(&self) -> &str {
        &self.identifier
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    record: RegistryRecord,
    collection: DataCollection,
    serializer: Serializer,
}

impl Registry {
    pub fn new(record: RegistryRecord, collection: DataCollection, serializer: Serializer) -> Self {
        Self {
            record,
            collection,
            serializer,
        }
    }

    pub fn registry_type(&self) -> RegistryType {
        self.record.registry_type
    }

    pub fn id(&self) -> &str {
        &self.record.registry_id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &RegistryRecord {
        &self.record
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    /// Every resource in the registry. Objects that no longer parse against
    /// the current model are skipped.
    pub async fn get_all(&self) -> Result<Vec<Resource>> {
        let objects = self.collection.get_all().await?;
        let mut resources = Vec::with_capacity(objects.len());
        for object in objects {
            match self.serializer.from_json(&object) {
                Ok(resource) => resources.push(resource),
                Err(e) => warn!(
                    registry = %self.record.collection_id(),
                    error = %e,
                    "Skipping unreadable resource"
                ),
            }
        }
        Ok(resources)
    }

    pub async fn get(&self, id: &str) -> Result<Resource> {
        let object = self.collection.get(id).await?;
        self.serializer.from_json(&object)
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.collection.exists(id).await?)
    }

    pub async fn add(&self, resource: &Resource, options: WriteOptions) -> Result<()> {
        let object = self.to_stored(resource, options)?;
        self.collection
            .add(&resource.identifier, object, options.force)
            .await?;
        debug!(registry = %self.record.collection_id(), resource = %resource.fqi(), "Resource added");
        Ok(())
    }

    /// Add resources one after another; stops at the first failure.
    pub async fn add_all(&self, resources: &[Resource], options: WriteOptions) -> Result<()> {
        for resource in resources {
            self.add(resource, options).await?;
        }
        Ok(())
    }

    pub async fn update(&self, resource: &Resource, options: WriteOptions) -> Result<()> {
        let object = self.to_stored(resource, options)?;
        self.collection.update(&resource.identifier, object).await?;
        debug!(registry = %self.record.collection_id(), resource = %resource.fqi(), "Resource updated");
        Ok(())
    }

    pub async fn update_all(&self, resources: &[Resource], options: WriteOptions) -> Result<()> {
        for resource in resources {
            self.update(resource, options).await?;
        }
        Ok(())
    }

    /// Remove by resource or by ID.
    pub async fn remove<K: ResourceKey + ?Sized>(&self, key: &K) -> Result<()> {
        let id = key.resource_id();
        self.collection.remove(id).await?;
        debug!(registry = %self.record.collection_id(), id = %id, "Resource removed");
        Ok(())
    }

    pub async fn remove_all<K: ResourceKey>(&self, keys: &[K]) -> Result<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }

    fn to_stored(&self, resource: &Resource, options: WriteOptions) -> Result<Value> {
        self.check_type(resource)?;
        let mut object = self.serializer.to_json(
            resource,
            SerializeOptions {
                convert_resources_to_relationships: options.convert_resources_to_relationships,
            },
        )?;
        if let Value::Object(map) = &mut object {
            map.insert(
                REGISTRY_TYPE_FIELD.to_string(),
                Value::String(self.record.registry_type.to_string()),
            );
            map.insert(
                REGISTRY_ID_FIELD.to_string(),
                Value::String(self.record.registry_id.clone()),
            );
        }
        Ok(object)
    }

    fn check_type(&self, resource: &Resource) -> Result<()> {
        let declaration = self.serializer.introspector().get(&resource.fqn())?;
        if RegistryType::for_kind(declaration.kind) != Some(self.record.registry_type) {
            return Err(RuntimeError::Resource(format!(
                "Cannot add type: {} to {}",
                declaration.kind, self.record.registry_type
            )));
        }
        Ok(())
    }
}
