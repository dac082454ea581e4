//! Resource CRUD, resolution and queries against one registry.
//!
//! Every engine write stores nested resources as relationships.

use serde_json::Value;

use super::{Engine, RegistryRef};
use crate::context::Context;
use crate::error::Result;
use crate::registry::{Registry, WriteOptions};
use crate::resource::Resource;
use crate::serializer::SerializeOptions;

const ENGINE_WRITE: WriteOptions = WriteOptions {
    convert_resources_to_relationships: true,
    force: false,
};

impl Engine {
    pub(super) async fn get_all_resources(&self, context: &mut Context, registry: &RegistryRef) -> Result<Value> {
        let resources = open(context, registry).await?.get_all().await?;
        to_json_array(context, &resources)
    }

    pub(super) async fn get_resource(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        id: &str,
    ) -> Result<Value> {
        let resource = open(context, registry).await?.get(id).await?;
        context
            .serializer()?
            .to_json(&resource, SerializeOptions::default())
    }

    pub(super) async fn exists_resource(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        id: &str,
    ) -> Result<Value> {
        let exists = open(context, registry).await?.exists(id).await?;
        Ok(Value::Bool(exists))
    }

    pub(super) async fn add_resources(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        objects: &[Value],
    ) -> Result<Value> {
        let resources = parse_all(context, objects)?;
        open(context, registry)
            .await?
            .add_all(&resources, ENGINE_WRITE)
            .await?;
        Ok(Value::Null)
    }

    pub(super) async fn update_resources(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        objects: &[Value],
    ) -> Result<Value> {
        let resources = parse_all(context, objects)?;
        open(context, registry)
            .await?
            .update_all(&resources, ENGINE_WRITE)
            .await?;
        Ok(Value::Null)
    }

    pub(super) async fn remove_resources(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        ids: &[String],
    ) -> Result<Value> {
        open(context, registry).await?.remove_all(ids).await?;
        Ok(Value::Null)
    }

    pub(super) async fn resolve_resource(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        id: &str,
    ) -> Result<Value> {
        let resource = open(context, registry).await?.get(id).await?;
        context.resolver()?.resolve(&resource).await
    }

    pub(super) async fn resolve_all_resources(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
    ) -> Result<Value> {
        let resources = open(context, registry).await?.get_all().await?;
        let resolver = context.resolver()?;
        let mut resolved = Vec::with_capacity(resources.len());
        for resource in &resources {
            resolved.push(resolver.resolve(resource).await?);
        }
        Ok(Value::Array(resolved))
    }

    pub(super) async fn execute_query(
        &self,
        context: &mut Context,
        registry: &RegistryRef,
        selector: &Value,
    ) -> Result<Value> {
        let matched = context
            .query_service()?
            .execute(registry.registry_type, &registry.registry_id, selector)
            .await?;
        to_json_array(context, &matched)
    }
}

async fn open(context: &Context, registry: &RegistryRef) -> Result<Registry> {
    context
        .registry_manager()?
        .get(registry.registry_type, &registry.registry_id)
        .await
}

fn parse_all(context: &Context, objects: &[Value]) -> Result<Vec<Resource>> {
    let serializer = context.serializer()?;
    objects.iter().map(|object| serializer.from_json(object)).collect()
}

fn to_json_array(context: &Context, resources: &[Resource]) -> Result<Value> {
    let serializer = context.serializer()?;
    resources
        .iter()
        .map(|resource| serializer.to_json(resource, SerializeOptions::default()))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}
