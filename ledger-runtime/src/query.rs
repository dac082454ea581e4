//! Equality-selector queries over a registry.
//!
//! A selector is a JSON object of `path: value` pairs; dotted paths reach
//! into nested objects. A resource matches when every pair is equal.

use serde_json::{Map, Value};

use crate::error::{Result, RuntimeError};
use crate::registry::RegistryType;
use crate::registry_manager::RegistryManager;
use crate::resource::Resource;
use crate::serializer::SerializeOptions;

#[derive(Debug, Clone)]
pub struct QueryService {
    registries: RegistryManager,
}

impl QueryService {
    pub fn new(registries: RegistryManager) -> Self {
        Self { registries }
    }

    pub async fn execute(
        &self,
        registry_type: RegistryType,
        registry_id: &str,
        selector: &Value,
    ) -> Result<Vec<Resource>> {
        let selector = selector.as_object().ok_or_else(|| {
            RuntimeError::Resource("Query selector must be a JSON object".to_string())
        })?;
        let registry = self.registries.get(registry_type, registry_id).await?;
        let serializer = self.registries.serializer();

        let mut matched = Vec::new();
        for resource in registry.get_all().await? {
            let json = serializer.to_json(&resource, SerializeOptions::default())?;
            if matches(&json, selector) {
                matched.push(resource);
            }
        }
        Ok(matched)
    }
}

fn matches(object: &Value, selector: &Map<String, Value>) -> bool {
    selector
        .iter()
        .all(|(path, expected)| lookup(object, path) == Some(expected))
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}
