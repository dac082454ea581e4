//! Model declarations and the introspector.
//!
//! Archives carry models as pre-compiled JSON descriptors:
//!
//! ```json
//! { "namespace": "org.acme",
//!   "declarations": [
//!     { "name": "Sheep", "kind": "asset", "identifiedBy": "sheepId" },
//!     { "name": "Farmer", "kind": "participant", "identifiedBy": "farmerId" },
//!     { "name": "BuySheep", "kind": "transaction" } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, RuntimeError};

/// What sort of type a declaration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Asset,
    Participant,
    Transaction,
    Event,
    Concept,
}

impl DeclarationKind {
    /// Field used as identifier when a declaration does not name one.
    fn default_identifier(self) -> Option<&'static str> {
        match self {
            DeclarationKind::Transaction => Some("transactionId"),
            DeclarationKind::Event => Some("eventId"),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeclarationKind::Asset => "Asset",
            DeclarationKind::Participant => "Participant",
            DeclarationKind::Transaction => "Transaction",
            DeclarationKind::Event => "Event",
            DeclarationKind::Concept => "Concept",
        };
        f.write_str(name)
    }
}

/// One declaration as written in a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationSpec {
    pub name: String,
    pub kind: DeclarationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_by: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

/// A model file: a namespace and its declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub namespace: String,
    #[serde(default)]
    pub declarations: Vec<DeclarationSpec>,
}

impl ModelFile {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            declarations: Vec::new(),
        }
    }

    fn declare(mut self, name: &str, kind: DeclarationKind, identified_by: Option<&str>) -> Self {
        self.declarations.push(DeclarationSpec {
            name: name.to_string(),
            kind,
            identified_by: identified_by.map(str::to_string),
            is_abstract: false,
        });
        self
    }

    pub fn asset(self, name: &str, identified_by: &str) -> Self {
        self.declare(name, DeclarationKind::Asset, Some(identified_by))
    }

    pub fn participant(self, name: &str, identified_by: &str) -> Self {
        self.declare(name, DeclarationKind::Participant, Some(identified_by))
    }

    pub fn transaction(self, name: &str) -> Self {
        self.declare(name, DeclarationKind::Transaction, None)
    }

    pub fn event(self, name: &str) -> Self {
        self.declare(name, DeclarationKind::Event, None)
    }

    pub fn concept(self, name: &str) -> Self {
        self.declare(name, DeclarationKind::Concept, None)
    }

    /// Mark the most recently declared type abstract.
    pub fn as_abstract(mut self) -> Self {
        if let Some(last) = self.declarations.last_mut() {
            last.is_abstract = true;
        }
        self
    }
}

/// A resolved declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub namespace: String,
    pub name: String,
    pub kind: DeclarationKind,
    pub identified_by: Option<String>,
    pub is_abstract: bool,
}

impl ClassDeclaration {
    pub fn fqn(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Whether instances of this type carry an identifier.
    pub fn is_identified(&self) -> bool {
        self.identified_by.is_some()
    }
}

/// Split `org.acme.Sheep` into `("org.acme", "Sheep")`.
pub fn split_fqn(fqn: &str) -> Result<(&str, &str)> {
    match fqn.rsplit_once('.') {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
            Ok((namespace, name))
        }
        _ => Err(RuntimeError::Model(format!(
            "'{fqn}' is not a fully qualified type name"
        ))),
    }
}

/// Index of every declaration in a business network.
#[derive(Debug, Clone, Default)]
pub struct Introspector {
    classes: BTreeMap<String, ClassDeclaration>,
}

impl Introspector {
    pub fn new(models: &[ModelFile]) -> Result<Self> {
        let mut classes = BTreeMap::new();
        for model in models {
            for spec in &model.declarations {
                let identified_by = spec
                    .identified_by
                    .clone()
                    .or_else(|| spec.kind.default_identifier().map(str::to_string));
                let declaration = ClassDeclaration {
                    namespace: model.namespace.clone(),
                    name: spec.name.clone(),
                    kind: spec.kind,
                    identified_by,
                    is_abstract: spec.is_abstract,
                };

                let fqn = declaration.fqn();
                let needs_identifier = matches!(
                    declaration.kind,
                    DeclarationKind::Asset | DeclarationKind::Participant
                );
                if needs_identifier && !declaration.is_abstract && !declaration.is_identified() {
                    return Err(RuntimeError::Model(format!(
                        "{} {fqn} must declare an identifying field",
                        declaration.kind
                    )));
                }
                if classes.insert(fqn.clone(), declaration).is_some() {
                    return Err(RuntimeError::Model(format!("Duplicate declaration {fqn}")));
                }
            }
        }
        Ok(Self { classes })
    }

    pub fn find(&self, fqn: &str) -> Option<&ClassDeclaration> {
        self.classes.get(fqn)
    }

    pub fn get(&self, fqn: &str) -> Result<&ClassDeclaration> {
        self.find(fqn)
            .ok_or_else(|| RuntimeError::Model(format!("Type {fqn} is not declared")))
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ClassDeclaration> {
        self.classes.values()
    }

    /// Concrete declarations of one kind, ordered by name.
    pub fn concrete(&self, kind: DeclarationKind) -> impl Iterator<Item = &ClassDeclaration> {
        self.classes
            .values()
            .filter(move |c| c.kind == kind && !c.is_abstract)
    }
}
