//! Replaces relationships with the resources they point at.

use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

use crate::error::Result;
use crate::registry::RegistryType;
use crate::registry_manager::RegistryManager;
use crate::resource::{Relationship, Resource};
use crate::serializer::{SerializeOptions, CLASS_FIELD};

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct Resolver {
    registries: RegistryManager,
}

impl Resolver {
    pub fn new(registries: RegistryManager) -> Self {
        Self { registries }
    }

    /// JSON of `resource` with every reachable relationship expanded.
    /// A relationship back to a resource already being expanded is left as is.
    pub async fn resolve(&self, resource: &Resource) -> Result<Value> {
        let json = self
            .registries
            .serializer()
            .to_json(resource, SerializeOptions::default())?;
        let mut stack = vec![resource.fqi()];
        self.resolve_value(json, &mut stack).await
    }

    fn resolve_value<'a>(&'a self, value: Value, stack: &'a mut Vec<String>) -> ResolveFuture<'a> {
        Box::pin(async move {
            match value {
                Value::String(text) if Relationship::is_relationship(&text) => {
                    self.resolve_relationship(text, stack).await
                }
                Value::Array(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(self.resolve_value(item, stack).await?);
                    }
                    Ok(Value::Array(resolved))
                }
                Value::Object(object) => {
                    let mut resolved = Map::with_capacity(object.len());
                    for (field, item) in object {
                        let item = if field == CLASS_FIELD {
                            item
                        } else {
                            self.resolve_value(item, stack).await?
                        };
                        resolved.insert(field, item);
                    }
                    Ok(Value::Object(resolved))
                }
                other => Ok(other),
            }
        })
    }

    async fn resolve_relationship(&self, text: String, stack: &mut Vec<String>) -> Result<Value> {
        let relationship = Relationship::parse(&text)?;
        let key = format!("{}#{}", relationship.fqn(), relationship.identifier);
        if stack.contains(&key) {
            return Ok(Value::String(text));
        }

        let Some(target) = self.lookup(&relationship).await? else {
            warn!(relationship = %text, "Relationship target not found");
            return Ok(Value::String(text));
        };

        let json = self
            .registries
            .serializer()
            .to_json(&target, SerializeOptions::default())?;
        stack.push(key);
        let resolved = self.resolve_value(json, stack).await;
        stack.pop();
        resolved
    }

    async fn lookup(&self, relationship: &Relationship) -> Result<Option<Resource>> {
        let fqn = relationship.fqn();
        let Some(declaration) = self.registries.serializer().introspector().find(&fqn) else {
            return Ok(None);
        };
        let Some(registry_type) = RegistryType::for_kind(declaration.kind) else {
            return Ok(None);
        };
        let registry = match self.registries.get(registry_type, &fqn).await {
            Ok(registry) => registry,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        match registry.get(&relationship.identifier).await {
            Ok(resource) => Ok(Some(resource)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Introspector, ModelFile};
    use crate::registry::WriteOptions;
    use crate::registry_manager::SYSREGISTRIES;
    use crate::serializer::Serializer;
    use ledger_store::DataService;
    use serde_json::json;
    use std::sync::Arc;

    async fn registries() -> RegistryManager {
        let model = ModelFile::new("org.acme")
            .asset("Sheep", "sheepId")
            .participant("Farmer", "farmerId");
        let serializer = Serializer::new(Arc::new(Introspector::new(&[model]).unwrap()));
        let service = DataService::in_memory();
        let sysregistries = service.create_collection(SYSREGISTRIES, false).await.unwrap();
        let manager = RegistryManager::new(service, serializer, sysregistries);
        manager.create_defaults(false).await.unwrap();
        manager
    }

    #[tokio::test]
    async fn test_resolves_nested_relationships_and_stops_at_cycles() {
        let manager = registries().await;
        let farmers = manager
            .get(RegistryType::Participant, "org.acme.Farmer")
            .await
            .unwrap();
        let sheep = manager
            .get(RegistryType::Asset, "org.acme.Sheep")
            .await
            .unwrap();

        let bob = Resource::new("org.acme.Farmer", "bob")
            .unwrap()
            .with_field("farmerId", json!("bob"))
            .with_field("favourite", json!("resource:org.acme.Sheep#1"));
        farmers.add(&bob, WriteOptions::default()).await.unwrap();
        let dolly = Resource::new("org.acme.Sheep", "1")
            .unwrap()
            .with_field("sheepId", json!("1"))
            .with_field("owner", json!("resource:org.acme.Farmer#bob"))
            .with_field("friend", json!("resource:org.acme.Sheep#404"));
        sheep.add(&dolly, WriteOptions::default()).await.unwrap();

        let resolved = Resolver::new(manager).resolve(&dolly).await.unwrap();
        assert_eq!(resolved["owner"]["farmerId"], json!("bob"));
        // back-reference to the root stays a relationship
        assert_eq!(
            resolved["owner"]["favourite"],
            json!("resource:org.acme.Sheep#1")
        );
        // dangling relationship is kept
        assert_eq!(resolved["friend"], json!("resource:org.acme.Sheep#404"));
    }
}
