use serde_json::Value;

use super::{Engine, RegistryRef};
use crate::context::Context;
use crate::error::Result;
use crate::registry::RegistryType;

impl Engine {
    pub(super) async fn get_all_registries(
        &self,
        context: &mut Context,
        registry_type: RegistryType,
    ) -> Result<Value> {
        let records: Vec<_> = context
            .registry_manager()?
            .get_all(registry_type)
            .await?
            .iter()
            .map(|registry| registry.record().clone())
            .collect();
        Ok(serde_json::to_value(records)?)
    }

    pub(super) async fn get_registry(&self, context: &mut Context, registry: &RegistryRef) -> Result<Value> {
        let found = context
            .registry_manager()?
            .get(registry.registry_type, &registry.registry_id)
            .await?;
        Ok(serde_json::to_value(found.record())?)
    }

    pub(super) async fn exists_registry(&self, context: &mut Context, registry: &RegistryRef) -> Result<Value> {
        let exists = context
            .registry_manager()?
            .exists(registry.registry_type, &registry.registry_id)
            .await?;
        Ok(Value::Bool(exists))
    }

    pub(super) async fn add_registry(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        name: &str,
    ) -> Result<Value> {
        let added = context
            .registry_manager()?
            .add(registry.registry_type, &registry.registry_id, name, false)
            .await?;
        Ok(serde_json::to_value(added.record())?)
    }
}
