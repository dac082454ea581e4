//! JSON <-> Resource conversion.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{Result, RuntimeError};
use crate::model::{ClassDeclaration, DeclarationKind, Introspector};
use crate::resource::{Relationship, Resource};

pub const CLASS_FIELD: &str = "$class";
/// Internal property naming the registry type an object is stored in.
pub const REGISTRY_TYPE_FIELD: &str = "$registryType";
/// Internal property naming the registry ID an object is stored in.
pub const REGISTRY_ID_FIELD: &str = "$registryId";

#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Replace nested identified resources with relationship strings.
    pub convert_resources_to_relationships: bool,
}

impl SerializeOptions {
    pub fn converting() -> Self {
        Self {
            convert_resources_to_relationships: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Serializer {
    introspector: Arc<Introspector>,
}

impl Serializer {
    pub fn new(introspector: Arc<Introspector>) -> Self {
        Self { introspector }
    }

    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }

    /// Parse a stored or submitted JSON object.
    pub fn from_json(&self, value: &Value) -> Result<Resource> {
        let object = value
            .as_object()
            .ok_or_else(|| RuntimeError::Resource("Expected a Resource".to_string()))?;
        let class = object
            .get(CLASS_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RuntimeError::Resource(format!("Missing {CLASS_FIELD} property"))
            })?;

        let declaration = self.instantiable(class)?;
        let id_field = identifier_field(declaration)?;
        let identifier = object
            .get(id_field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RuntimeError::Resource(format!(
                    "Missing identifier field '{id_field}' for {class}"
                ))
            })?;

        let mut resource = Resource::new(class, identifier)?;
        resource.data = object
            .iter()
            .filter(|(k, _)| !is_internal(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(resource)
    }

    pub fn to_json(&self, resource: &Resource, options: SerializeOptions) -> Result<Value> {
        let fqn = resource.fqn();
        let declaration = self.instantiable(&fqn)?;
        let id_field = identifier_field(declaration)?;

        let mut object = Map::new();
        object.insert(CLASS_FIELD.to_string(), Value::String(fqn));
        for (field, value) in &resource.data {
            if is_internal(field) {
                continue;
            }
            let value = if options.convert_resources_to_relationships {
                self.flatten(value)
            } else {
                value.clone()
            };
            object.insert(field.clone(), value);
        }
        object.insert(
            id_field.to_string(),
            Value::String(resource.identifier.clone()),
        );
        Ok(Value::Object(object))
    }

    fn instantiable(&self, fqn: &str) -> Result<&ClassDeclaration> {
        let declaration = self.introspector.get(fqn)?;
        if declaration.is_abstract {
            return Err(RuntimeError::Resource(format!(
                "Cannot instantiate abstract type {fqn}"
            )));
        }
        Ok(declaration)
    }

    fn flatten(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.flatten(v)).collect()),
            Value::Object(object) => {
                if let Some(relationship) = self.as_relationship(object) {
                    return Value::String(relationship.to_string());
                }
                Value::Object(
                    object
                        .iter()
                        .map(|(k, v)| (k.clone(), self.flatten(v)))
                        .collect(),
                )
            }
            other => other.clone(),
        }
    }

    /// A nested object that is an identified resource, as a relationship.
    fn as_relationship(&self, object: &Map<String, Value>) -> Option<Relationship> {
        let class = object.get(CLASS_FIELD)?.as_str()?;
        let declaration = self.introspector.find(class)?;
        if !matches!(
            declaration.kind,
            DeclarationKind::Asset | DeclarationKind::Participant | DeclarationKind::Transaction
        ) {
            return None;
        }
        let id = object.get(declaration.identified_by.as_deref()?)?.as_str()?;
        Relationship::new(class, id).ok()
    }
}

fn identifier_field(declaration: &ClassDeclaration) -> Result<&str> {
    declaration.identified_by.as_deref().ok_or_else(|| {
        RuntimeError::Resource(format!("Type {} is not identifiable", declaration.fqn()))
    })
}

fn is_internal(field: &str) -> bool {
    field == CLASS_FIELD || field == REGISTRY_TYPE_FIELD || field == REGISTRY_ID_FIELD
}
