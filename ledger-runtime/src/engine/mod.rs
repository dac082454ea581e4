//! Engine - dispatches invoke and query calls.
//!
//! Every call follows the same sequence on its Context:
//!
//! ```text
//!   parse (arity + argument shape) ──► initialize ──► transaction_start
//!        │                                                  │
//!        ▼                                                  ▼
//!   error, nothing touched                         handler (dispatch)
//!                                                   │            │
//!                                                  ok          error / cancel / timeout
//!                                                   ▼            ▼
//!                                       prepare ► commit      rollback
//!                                                   └──► end ◄───┘
//! ```
//!
//! Handlers are grouped by area in the submodules; each is an `impl Engine`
//! block.

mod business_networks;
mod identities;
pub mod operation;
mod registries;
mod resources;
mod system;
mod transactions;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cancel::supervise;
use crate::context::{Context, InitializeOptions};
use crate::error::{Result, RuntimeError};

pub use operation::{Operation, RegistryRef};

#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Deploy a business network: `args` is the base64 archive.
    pub async fn init(&self, context: &mut Context, args: &[String]) -> Result<Value> {
        let operation = Operation::parse_init(args)?;
        self.execute(context, operation, false).await
    }

    /// Run a function that may change state.
    pub async fn invoke(&self, context: &mut Context, function: &str, args: &[String]) -> Result<Value> {
        let operation = Operation::parse(function, args)?;
        self.execute(context, operation, false).await
    }

    /// Run a read-only function.
    pub async fn query(&self, context: &mut Context, function: &str, args: &[String]) -> Result<Value> {
        let operation = Operation::parse(function, args)?;
        if !operation.is_read_only() {
            return Err(RuntimeError::unsupported_function(function, args));
        }
        self.execute(context, operation, true).await
    }

    async fn execute(&self, context: &mut Context, operation: Operation, read_only: bool) -> Result<Value> {
        let function = operation.name();
        let token = context.call_token();
        let limit = context.container().config().call_timeout();
        debug!(context = %context.id(), function, read_only, "Engine call started");

        let result = supervise(self.run(context, operation, read_only), &token, limit).await;
        match result {
            Ok(value) => {
                context.transaction_end().await?;
                debug!(context = %context.id(), function, "Engine call complete");
                Ok(value)
            }
            Err(error) => {
                if let Err(e) = context.transaction_rollback().await {
                    warn!(context = %context.id(), error = %e, "Rollback failed");
                }
                if let Err(e) = context.transaction_end().await {
                    warn!(context = %context.id(), error = %e, "Transaction end failed");
                }
                info!(context = %context.id(), function, error = %error, "Engine call failed");
                Err(error)
            }
        }
    }

    async fn run(&self, context: &mut Context, operation: Operation, read_only: bool) -> Result<Value> {
        if !matches!(operation, Operation::Deploy { .. }) {
            context
                .initialize(InitializeOptions {
                    allow_activation: operation.allows_activation(),
                    reinitialize: false,
                })
                .await?;
        }
        context.transaction_start(read_only).await?;
        let value = self.dispatch(context, operation).await?;
        context.transaction_prepare().await?;
        context.transaction_commit().await?;
        Ok(value)
    }

    async fn dispatch(&self, context: &mut Context, operation: Operation) -> Result<Value> {
        match operation {
            Operation::Ping => self.ping(context).await,
            Operation::GetLogLevel => self.get_log_level(context).await,
            Operation::SetLogLevel { level } => self.set_log_level(context, &level).await,

            Operation::Deploy { archive } => self.deploy(context, &archive).await,
            Operation::GetBusinessNetwork => self.get_business_network(context).await,
            Operation::UpdateBusinessNetwork { archive } => {
                self.update_business_network(context, &archive).await
            }
            Operation::ResetBusinessNetwork => self.reset_business_network(context).await,
            Operation::UndeployBusinessNetwork => self.undeploy_business_network(context).await,

            Operation::IssueIdentity { participant, name } => {
                self.issue_identity(context, &participant, &name).await
            }
            Operation::BindIdentity {
                participant,
                certificate,
            } => self.bind_identity(context, &participant, &certificate).await,
            Operation::ActivateIdentity => self.activate_identity(context).await,
            Operation::RevokeIdentity { identity_id } => {
                self.revoke_identity(context, &identity_id).await
            }

            Operation::GetAllRegistries { registry_type } => {
                self.get_all_registries(context, registry_type).await
            }
            Operation::GetRegistry(registry) => self.get_registry(context, &registry).await,
            Operation::ExistsRegistry(registry) => self.exists_registry(context, &registry).await,
            Operation::AddRegistry { registry, name } => {
                self.add_registry(context, &registry, &name).await
            }

            Operation::GetAllResources(registry) => {
                self.get_all_resources(context, &registry).await
            }
            Operation::GetResource { registry, id } => {
                self.get_resource(context, &registry, &id).await
            }
            Operation::ExistsResource { registry, id } => {
                self.exists_resource(context, &registry, &id).await
            }
            Operation::AddResource { registry, resource } => {
                self.add_resources(context, &registry, &[resource]).await
            }
            Operation::AddAllResources {
                registry,
                resources,
            } => self.add_resources(context, &registry, &resources).await,
            Operation::UpdateResource { registry, resource } => {
                self.update_resources(context, &registry, &[resource]).await
            }
            Operation::UpdateAllResources {
                registry,
                resources,
            } => self.update_resources(context, &registry, &resources).await,
            Operation::RemoveResource { registry, id } => {
                self.remove_resources(context, &registry, &[id]).await
            }
            Operation::RemoveAllResources { registry, ids } => {
                self.remove_resources(context, &registry, &ids).await
            }
            Operation::ResolveResource { registry, id } => {
                self.resolve_resource(context, &registry, &id).await
            }
            Operation::ResolveAllResources(registry) => {
                self.resolve_all_resources(context, &registry).await
            }
            Operation::ExecuteQuery { registry, selector } => {
                self.execute_query(context, &registry, &selector).await
            }

            Operation::SubmitTransaction { transaction } => {
                self.submit_transaction(context, &transaction).await
            }
        }
    }
}
