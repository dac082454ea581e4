//! The closed set of engine functions.
//!
//! Incoming calls are `(function, args)` with string arguments. Parsing
//! checks the argument count against the function's signature first and
//! only then converts each argument, so a malformed call never reaches a
//! handler.

use serde_json::Value;

use crate::error::{Result, RuntimeError};
use crate::registry::RegistryType;
use crate::resource::Relationship;

/// Function name and parameter names, in argument order.
type Signature = (&'static str, &'static [&'static str]);

const SIGNATURES: &[Signature] = &[
    ("ping", &[]),
    ("getLogLevel", &[]),
    ("setLogLevel", &["newLogLevel"]),
    ("getBusinessNetwork", &[]),
    ("updateBusinessNetwork", &["businessNetworkArchive"]),
    ("resetBusinessNetwork", &[]),
    ("undeployBusinessNetwork", &[]),
    ("issueIdentity", &["participantFQI", "identityName"]),
    ("bindIdentity", &["participantFQI", "certificate"]),
    ("activateIdentity", &[]),
    ("revokeIdentity", &["identityId"]),
    ("getAllRegistries", &["registryType"]),
    ("getRegistry", &["registryType", "registryId"]),
    ("existsRegistry", &["registryType", "registryId"]),
    ("addRegistry", &["registryType", "registryId", "registryName"]),
    ("getAllResourcesInRegistry", &["registryType", "registryId"]),
    ("getResourceInRegistry", &["registryType", "registryId", "resourceId"]),
    ("existsResourceInRegistry", &["registryType", "registryId", "resourceId"]),
    ("addResourceToRegistry", &["registryType", "registryId", "serializedResource"]),
    ("addAllResourcesToRegistry", &["registryType", "registryId", "serializedResources"]),
    ("updateResourceInRegistry", &["registryType", "registryId", "serializedResource"]),
    ("updateAllResourcesInRegistry", &["registryType", "registryId", "serializedResources"]),
    ("removeResourceFromRegistry", &["registryType", "registryId", "resourceId"]),
    ("removeAllResourcesFromRegistry", &["registryType", "registryId", "resourceIds"]),
    ("resolveResourceInRegistry", &["registryType", "registryId", "resourceId"]),
    ("resolveAllResourcesInRegistry", &["registryType", "registryId"]),
    ("executeQuery", &["registryType", "registryId", "selector"]),
    ("submitTransaction", &["serializedResource"]),
];

const INIT: Signature = ("init", &["businessNetworkArchive"]);

/// Registry addressed by a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRef {
    pub registry_type: RegistryType,
    pub registry_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Ping,
    GetLogLevel,
    SetLogLevel { level: String },

    Deploy { archive: String },
    GetBusinessNetwork,
    UpdateBusinessNetwork { archive: String },
    ResetBusinessNetwork,
    UndeployBusinessNetwork,

    IssueIdentity { participant: Relationship, name: String },
    BindIdentity { participant: Relationship, certificate: String },
    ActivateIdentity,
    RevokeIdentity { identity_id: String },

    GetAllRegistries { registry_type: RegistryType },
    GetRegistry(RegistryRef),
    ExistsRegistry(RegistryRef),
    AddRegistry { registry: RegistryRef, name: String },

    GetAllResources(RegistryRef),
    GetResource { registry: RegistryRef, id: String },
    ExistsResource { registry: RegistryRef, id: String },
    AddResource { registry: RegistryRef, resource: Value },
    AddAllResources { registry: RegistryRef, resources: Vec<Value> },
    UpdateResource { registry: RegistryRef, resource: Value },
    UpdateAllResources { registry: RegistryRef, resources: Vec<Value> },
    RemoveResource { registry: RegistryRef, id: String },
    RemoveAllResources { registry: RegistryRef, ids: Vec<String> },
    ResolveResource { registry: RegistryRef, id: String },
    ResolveAllResources(RegistryRef),
    ExecuteQuery { registry: RegistryRef, selector: Value },

    SubmitTransaction { transaction: Value },
}

impl Operation {
    /// Parse an `invoke`/`query` call.
    pub fn parse(function: &str, args: &[String]) -> Result<Self> {
        let (name, params) = SIGNATURES
            .iter()
            .find(|(name, _)| *name == function)
            .copied()
            .ok_or_else(|| RuntimeError::unsupported_function(function, args))?;
        if args.len() != params.len() {
            return Err(RuntimeError::invalid_arguments(name, args, params));
        }

        let shape = || RuntimeError::invalid_arguments(name, args, params);
        let registry = || -> Result<RegistryRef> {
            Ok(RegistryRef {
                registry_type: args[0].parse().map_err(|_| shape())?,
                registry_id: args[1].clone(),
            })
        };
        let json = |arg: &str| -> Result<Value> { serde_json::from_str(arg).map_err(|_| shape()) };
        let json_array = |arg: &str| -> Result<Vec<Value>> {
            match json(arg)? {
                Value::Array(items) => Ok(items),
                _ => Err(shape()),
            }
        };
        let participant = |arg: &str| Relationship::parse(arg).map_err(|_| shape());

        let operation = match name {
            "ping" => Self::Ping,
            "getLogLevel" => Self::GetLogLevel,
            "setLogLevel" => Self::SetLogLevel {
                level: args[0].clone(),
            },
            "getBusinessNetwork" => Self::GetBusinessNetwork,
            "updateBusinessNetwork" => Self::UpdateBusinessNetwork {
                archive: args[0].clone(),
            },
            "resetBusinessNetwork" => Self::ResetBusinessNetwork,
            "undeployBusinessNetwork" => Self::UndeployBusinessNetwork,
            "issueIdentity" => Self::IssueIdentity {
                participant: participant(&args[0])?,
                name: args[1].clone(),
            },
            "bindIdentity" => Self::BindIdentity {
                participant: participant(&args[0])?,
                certificate: args[1].clone(),
            },
            "activateIdentity" => Self::ActivateIdentity,
            "revokeIdentity" => Self::RevokeIdentity {
                identity_id: args[0].clone(),
            },
            "getAllRegistries" => Self::GetAllRegistries {
                registry_type: args[0].parse().map_err(|_| shape())?,
            },
            "getRegistry" => Self::GetRegistry(registry()?),
            "existsRegistry" => Self::ExistsRegistry(registry()?),
            "addRegistry" => Self::AddRegistry {
                registry: registry()?,
                name: args[2].clone(),
            },
            "getAllResourcesInRegistry" => Self::GetAllResources(registry()?),
            "getResourceInRegistry" => Self::GetResource {
                registry: registry()?,
                id: args[2].clone(),
            },
            "existsResourceInRegistry" => Self::ExistsResource {
                registry: registry()?,
                id: args[2].clone(),
            },
            "addResourceToRegistry" => Self::AddResource {
                registry: registry()?,
                resource: json(&args[2])?,
            },
            "addAllResourcesToRegistry" => Self::AddAllResources {
                registry: registry()?,
                resources: json_array(&args[2])?,
            },
            "updateResourceInRegistry" => Self::UpdateResource {
                registry: registry()?,
                resource: json(&args[2])?,
            },
            "updateAllResourcesInRegistry" => Self::UpdateAllResources {
                registry: registry()?,
                resources: json_array(&args[2])?,
            },
            "removeResourceFromRegistry" => Self::RemoveResource {
                registry: registry()?,
                id: args[2].clone(),
            },
            "removeAllResourcesFromRegistry" => Self::RemoveAllResources {
                registry: registry()?,
                ids: serde_json::from_str(&args[2]).map_err(|_| shape())?,
            },
            "resolveResourceInRegistry" => Self::ResolveResource {
                registry: registry()?,
                id: args[2].clone(),
            },
            "resolveAllResourcesInRegistry" => Self::ResolveAllResources(registry()?),
            "executeQuery" => Self::ExecuteQuery {
                registry: registry()?,
                selector: json(&args[2])?,
            },
            "submitTransaction" => Self::SubmitTransaction {
                transaction: json(&args[0])?,
            },
            _ => return Err(RuntimeError::unsupported_function(function, args)),
        };
        Ok(operation)
    }

    /// Parse the arguments of `init`.
    pub fn parse_init(args: &[String]) -> Result<Self> {
        let (name, params) = INIT;
        match args {
            [archive] => Ok(Self::Deploy {
                archive: archive.clone(),
            }),
            _ => Err(RuntimeError::invalid_arguments(name, args, params)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::GetLogLevel => "getLogLevel",
            Self::SetLogLevel { .. } => "setLogLevel",
            Self::Deploy { .. } => "init",
            Self::GetBusinessNetwork => "getBusinessNetwork",
            Self::UpdateBusinessNetwork { .. } => "updateBusinessNetwork",
            Self::ResetBusinessNetwork => "resetBusinessNetwork",
            Self::UndeployBusinessNetwork => "undeployBusinessNetwork",
            Self::IssueIdentity { .. } => "issueIdentity",
            Self::BindIdentity { .. } => "bindIdentity",
            Self::ActivateIdentity => "activateIdentity",
            Self::RevokeIdentity { .. } => "revokeIdentity",
            Self::GetAllRegistries { .. } => "getAllRegistries",
            Self::GetRegistry(_) => "getRegistry",
            Self::ExistsRegistry(_) => "existsRegistry",
            Self::AddRegistry { .. } => "addRegistry",
            Self::GetAllResources(_) => "getAllResourcesInRegistry",
            Self::GetResource { .. } => "getResourceInRegistry",
            Self::ExistsResource { .. } => "existsResourceInRegistry",
            Self::AddResource { .. } => "addResourceToRegistry",
            Self::AddAllResources { .. } => "addAllResourcesToRegistry",
            Self::UpdateResource { .. } => "updateResourceInRegistry",
            Self::UpdateAllResources { .. } => "updateAllResourcesInRegistry",
            Self::RemoveResource { .. } => "removeResourceFromRegistry",
            Self::RemoveAllResources { .. } => "removeAllResourcesFromRegistry",
            Self::ResolveResource { .. } => "resolveResourceInRegistry",
            Self::ResolveAllResources(_) => "resolveAllResourcesInRegistry",
            Self::ExecuteQuery { .. } => "executeQuery",
            Self::SubmitTransaction { .. } => "submitTransaction",
        }
    }

    /// Functions that `query` may run.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Ping
                | Self::GetLogLevel
                | Self::GetBusinessNetwork
                | Self::GetAllRegistries { .. }
                | Self::GetRegistry(_)
                | Self::ExistsRegistry(_)
                | Self::GetAllResources(_)
                | Self::GetResource { .. }
                | Self::ExistsResource { .. }
                | Self::ResolveResource { .. }
                | Self::ResolveAllResources(_)
                | Self::ExecuteQuery { .. }
        )
    }

    /// Only `activateIdentity` runs for an identity that is not yet active.
    pub fn allows_activation(&self) -> bool {
        matches!(self, Self::ActivateIdentity)
    }
}
