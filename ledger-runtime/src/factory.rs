//! Creates resources for a business network's declared types.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Result, RuntimeError};
use crate::model::{DeclarationKind, Introspector};
use crate::resource::{Relationship, Resource};

#[derive(Debug, Clone)]
pub struct Factory {
    introspector: Arc<Introspector>,
}

impl Factory {
    pub fn new(introspector: Arc<Introspector>) -> Self {
        Self { introspector }
    }

    /// A new asset or participant with its identifying field set.
    pub fn new_resource(&self, fqn: &str, identifier: &str) -> Result<Resource> {
        self.create(fqn, identifier, &[DeclarationKind::Asset, DeclarationKind::Participant])
    }

    /// A new transaction with a fresh ID and timestamp.
    pub fn new_transaction(&self, fqn: &str) -> Result<Resource> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut tx = self.create(fqn, &id, &[DeclarationKind::Transaction])?;
        tx.set("timestamp", Value::String(Utc::now().to_rfc3339()));
        Ok(tx)
    }

    /// A new event; its ID is assigned when it is emitted.
    pub fn new_event(&self, fqn: &str) -> Result<Resource> {
        let mut event = self.create(fqn, "", &[DeclarationKind::Event])?;
        event.set("timestamp", Value::String(Utc::now().to_rfc3339()));
        Ok(event)
    }

    pub fn new_relationship(&self, fqn: &str, identifier: &str) -> Result<Relationship> {
        self.introspector.get(fqn)?;
        Relationship::new(fqn, identifier)
    }

    fn create(&self, fqn: &str, identifier: &str, kinds: &[DeclarationKind]) -> Result<Resource> {
        let declaration = self.introspector.get(fqn)?;
        if !kinds.contains(&declaration.kind) {
            return Err(RuntimeError::Resource(format!(
                "{fqn} is a {}, not a {}",
                declaration.kind,
                kinds
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" or ")
            )));
        }
        if declaration.is_abstract {
            return Err(RuntimeError::Resource(format!(
                "Cannot instantiate abstract type {fqn}"
            )));
        }

        let mut resource = Resource::new(fqn, identifier)?;
        if let Some(field) = &declaration.identified_by {
            resource.set(field.clone(), Value::String(identifier.to_string()));
        }
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelFile;
    use serde_json::json;

    fn factory() -> Factory {
        let model = ModelFile::new("org.acme")
            .asset("Sheep", "sheepId")
            .transaction("BuySheep")
            .event("SheepSold");
        Factory::new(Arc::new(Introspector::new(&[model]).unwrap()))
    }

    #[test]
    fn test_new_resource_sets_identifier_field() {
        let sheep = factory().new_resource("org.acme.Sheep", "1").unwrap();
        assert_eq!(sheep.get("sheepId"), Some(&json!("1")));
    }

    #[test]
    fn test_new_transaction_has_id_and_timestamp() {
        let tx = factory().new_transaction("org.acme.BuySheep").unwrap();
        assert!(!tx.identifier.is_empty());
        assert_eq!(tx.get("transactionId"), Some(&json!(tx.identifier)));
        assert!(tx.get("timestamp").is_some());
    }

    #[test]
    fn test_kind_mismatch() {
        let err = factory().new_resource("org.acme.BuySheep", "1").unwrap_err();
        assert!(err.to_string().contains("is a Transaction"));
    }
}
