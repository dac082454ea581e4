use ledger_store::StoreError;
use serde_json::Value;
use tracing::{debug, info};

use super::Engine;
use crate::context::Context;
use crate::error::{Result, RuntimeError};
use crate::model::DeclarationKind;
use crate::registry::{RegistryType, WriteOptions};
use crate::registry_manager::DEFAULT_TRANSACTION_REGISTRY;

const NATIVE: &str = "native";

impl Engine {
    /// Run the processors for a transaction, then record it in its registry.
    /// A transaction id already recorded is rejected before anything runs.
    pub(super) async fn submit_transaction(&self, context: &mut Context, object: &Value) -> Result<Value> {
        let transaction = context.serializer()?.from_json(object)?;
        let declaration = context.introspector()?.get(&transaction.fqn())?.clone();
        if declaration.kind != DeclarationKind::Transaction {
            return Err(RuntimeError::Resource(format!(
                "{} is not a transaction",
                transaction.fqn()
            )));
        }
        // A resubmitted transaction must fail before any processor runs.
        let registries = context.registry_manager()?;
        let fqn = transaction.fqn();
        let registry_id = if registries.exists(RegistryType::Transaction, &fqn).await? {
            fqn.as_str()
        } else {
            DEFAULT_TRANSACTION_REGISTRY
        };
        let registry = registries.get(RegistryType::Transaction, registry_id).await?;
        if registry.exists(&transaction.identifier).await? {
            return Err(StoreError::DuplicateObject {
                collection_id: registry.record().collection_id(),
                id: transaction.identifier.clone(),
            }
            .into());
        }
        context.set_transaction(transaction.clone())?;

        let executor = context
            .executor(NATIVE)
            .ok_or_else(|| RuntimeError::Config(format!("No {NATIVE} transaction executor")))?;
        let api = context.api()?;
        let scripts = context.network()?.scripts.clone();
        debug!(transaction = %transaction.fqi(), "Executing transaction");
        let executed = executor.execute(&api, &scripts, &transaction).await?;
        if executed == 0 {
            return Err(RuntimeError::NoProcessors(fqn.clone()));
        }

        registry
            .add(
                &transaction,
                WriteOptions {
                    convert_resources_to_relationships: true,
                    force: false,
                },
            )
            .await?;

        info!(
            transaction = %transaction.fqi(),
            processors = executed,
            registry = %registry_id,
            "Transaction submitted"
        );
        Ok(Value::Null)
    }
}
