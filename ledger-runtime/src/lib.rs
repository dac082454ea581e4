//! Ledger Runtime - executes business networks over ledger-store
//!
//! A business network is an archive of model descriptors and script
//! descriptors. Once deployed, callers drive it through the [`Engine`]:
//! - `invoke` / `query` dispatch to a closed set of engine functions
//! - resources live in registries, one storage collection each
//! - identities map callers to participants (issue, bind, activate, revoke)
//! - submitted transactions run registered [`TransactionProcessor`]s
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────── Container ───────────────────────────────┐
//! │  DataService (shared)   LoggingService   NetworkCache   ProcessorTable │
//! └───────────────┬────────────────────────────────────────────────────────┘
//!                 │ create_context(identity)
//!         ┌───────▼────────┐        ┌──────────────────────────────┐
//!         │    Context     │◄───────│ Engine::invoke / query / init │
//!         └───────┬────────┘        └──────────────────────────────┘
//!                 │
//!   RegistryManager ── Registry ── DataCollection
//!   IdentityManager ── $sysidentities
//!   TransactionExecutor ── Api ── EventService
//! ```

pub mod api;
pub mod archive;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod container;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod factory;
pub mod identity;
pub mod identity_manager;
pub mod logging;
pub mod model;
pub mod query;
pub mod registry;
pub mod registry_manager;
pub mod resolver;
pub mod resource;
pub mod serializer;

pub use api::{Api, ApiRegistry};
pub use archive::{ArchiveBuilder, BusinessNetworkDefinition, ScriptDescriptor, ScriptFunction};
pub use cancel::CancelHandle;
pub use config::{ContainerConfig, StorageConfig};
pub use container::Container;
pub use context::{Context, InitializeOptions};
pub use engine::{Engine, Operation};
pub use error::{IdentityRejection, Result, RuntimeError};
pub use executor::{TransactionExecutor, TransactionProcessor};
pub use identity::{AnonymousIdentity, CertificateIdentity, IdentityService};
pub use identity_manager::{IdentityRecord, IdentityState};
pub use logging::LoggingService;
pub use model::{DeclarationKind, ModelFile};
pub use registry::{Registry, RegistryType, WriteOptions};
pub use registry_manager::RegistryManager;
pub use resource::{Relationship, Resource};
pub use serializer::{SerializeOptions, Serializer};

// Re-export the store so callers need only one dependency
pub use ledger_store;
