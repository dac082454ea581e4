//! Resources and relationships.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RuntimeError};
use crate::model::split_fqn;

/// URI scheme of a relationship.
pub const RELATIONSHIP_PREFIX: &str = "resource:";

/// A typed pointer to another resource: `resource:{namespace}.{Type}#{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub namespace: String,
    pub type_name: String,
    pub identifier: String,
}

impl Relationship {
    pub fn new(fqn: &str, identifier: impl Into<String>) -> Result<Self> {
        let (namespace, type_name) = split_fqn(fqn)?;
        Ok(Self {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            identifier: identifier.into(),
        })
    }

    pub fn fqn(&self) -> String {
        format!("{}.{}", self.namespace, self.type_name)
    }

    /// Parse `resource:ns.Type#id`; the scheme may be omitted.
    pub fn parse(text: &str) -> Result<Self> {
        let body = text.strip_prefix(RELATIONSHIP_PREFIX).unwrap_or(text);
        match body.split_once('#') {
            Some((fqn, id)) if !id.is_empty() => Self::new(fqn, id),
            _ => Err(RuntimeError::Resource(format!(
                "Invalid fully qualified identifier '{text}'"
            ))),
        }
    }

    /// Whether a string value looks like a serialized relationship.
    pub fn is_relationship(text: &str) -> bool {
        text.starts_with(RELATIONSHIP_PREFIX) && text.contains('#')
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}#{}",
            RELATIONSHIP_PREFIX, self.namespace, self.type_name, self.identifier
        )
    }
}

impl FromStr for Relationship {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// An instance of an asset, participant, transaction or event.
///
/// `data` holds every field, including the identifying one.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub namespace: String,
    pub type_name: String,
    pub identifier: String,
    pub data: Map<String, Value>,
}

impl Resource {
    pub fn new(fqn: &str, identifier: impl Into<String>) -> Result<Self> {
        let (namespace, type_name) = split_fqn(fqn)?;
        Ok(Self {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            identifier: identifier.into(),
            data: Map::new(),
        })
    }

    pub fn fqn(&self) -> String {
        format!("{}.{}", self.namespace, self.type_name)
    }

    /// Fully qualified identifier, `ns.Type#id`.
    pub fn fqi(&self) -> String {
        format!("{}#{}", self.fqn(), self.identifier)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.data.insert(field.into(), value);
    }

    pub fn with_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set(field, value);
        self
    }

    pub fn to_relationship(&self) -> Relationship {
        Relationship {
            namespace: self.namespace.clone(),
            type_name: self.type_name.clone(),
            identifier: self.identifier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relationship_text_form() {
        let rel = Relationship::parse("resource:org.acme.Farmer#bob").unwrap();
        assert_eq!(rel.fqn(), "org.acme.Farmer");
        assert_eq!(rel.identifier, "bob");
        assert_eq!(rel.to_string(), "resource:org.acme.Farmer#bob");

        let bare: Relationship = "org.acme.Farmer#bob".parse().unwrap();
        assert_eq!(bare, rel);
    }

    #[test]
    fn test_invalid_relationship() {
        assert!(Relationship::parse("resource:org.acme.Farmer").is_err());
        assert!(Relationship::parse("Farmer#bob").is_err());
        assert!(!Relationship::is_relationship("org.acme.Farmer#bob"));
    }

    #[test]
    fn test_resource_fields() {
        let sheep = Resource::new("org.acme.Sheep", "1")
            .unwrap()
            .with_field("sheepId", json!("1"))
            .with_field("owner", json!("resource:org.acme.Farmer#bob"));
        assert_eq!(sheep.fqi(), "org.acme.Sheep#1");
        assert_eq!(sheep.get("owner"), Some(&json!("resource:org.acme.Farmer#bob")));
        assert_eq!(sheep.to_relationship().to_string(), "resource:org.acme.Sheep#1");
    }
}
