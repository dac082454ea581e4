//! Deploying, reading, updating, resetting and undeploying the network.
//!
//! Update and reset are multi-step and not atomic across their steps: with
//! autocommit on, a failure part way leaves the state of the last step that
//! succeeded.

use serde_json::Value;
use tracing::info;

use super::Engine;
use crate::archive::hash_archive;
use crate::context::{Context, InitializeOptions, StoredNetwork, BUSINESS_NETWORK_KEY, SYSDATA};
use crate::error::Result;
use crate::identity_manager::SYSIDENTITIES;
use crate::registry::RegistryType;
use crate::registry_manager::{DEFAULT_TRANSACTION_REGISTRY, SYSREGISTRIES};

const REINITIALIZE: InitializeOptions = InitializeOptions {
    allow_activation: false,
    reinitialize: true,
};

impl Engine {
    /// Store the archive and create the system collections and default
    /// registries. Deploying over an existing store replaces the archive and
    /// keeps registries, resources and identities.
    pub(super) async fn deploy(&self, context: &mut Context, archive: &str) -> Result<Value> {
        let hash = hash_archive(archive);
        let network = context.container().load_network(&hash, archive).await?;

        let data = context.data_service().clone();
        let sysdata = data.ensure_collection(SYSDATA).await?;
        sysdata
            .add(
                BUSINESS_NETWORK_KEY,
                serde_json::to_value(StoredNetwork {
                    data: archive.to_string(),
                    hash: hash.clone(),
                    undeployed: false,
                })?,
                true,
            )
            .await?;
        data.ensure_collection(SYSREGISTRIES).await?;
        data.ensure_collection(SYSIDENTITIES).await?;

        context.initialize(REINITIALIZE).await?;
        ensure_default_registries(context).await?;

        info!(
            network = %network.definition.identifier(),
            hash = %hash,
            "Business network deployed"
        );
        Ok(Value::Null)
    }

    /// `{ data, hash }` of the deployed archive.
    pub(super) async fn get_business_network(&self, context: &mut Context) -> Result<Value> {
        let stored = read_stored(context).await?;
        Ok(serde_json::json!({ "data": stored.data, "hash": stored.hash }))
    }

    pub(super) async fn update_business_network(&self, context: &mut Context, archive: &str) -> Result<Value> {
        let hash = hash_archive(archive);
        // rejects a bad archive before anything is written
        let network = context.container().load_network(&hash, archive).await?;

        let sysdata = context.data_service().get_collection(SYSDATA).await?;
        sysdata
            .update(
                BUSINESS_NETWORK_KEY,
                serde_json::to_value(StoredNetwork {
                    data: archive.to_string(),
                    hash: hash.clone(),
                    undeployed: false,
                })?,
            )
            .await?;

        context.initialize(REINITIALIZE).await?;
        context.registry_manager()?.create_defaults(false).await?;

        info!(
            network = %network.definition.identifier(),
            hash = %hash,
            "Business network updated"
        );
        Ok(Value::Null)
    }

    /// Remove every registry and its data, then recreate the defaults.
    pub(super) async fn reset_business_network(&self, context: &mut Context) -> Result<Value> {
        let registries = context.registry_manager()?;
        let records = registries.records().await?;
        for record in &records {
            registries
                .remove(record.registry_type, &record.registry_id)
                .await?;
        }
        ensure_default_registries(context).await?;
        info!(removed = records.len(), "Business network reset");
        Ok(Value::Null)
    }

    pub(super) async fn undeploy_business_network(&self, context: &mut Context) -> Result<Value> {
        let mut stored = read_stored(context).await?;
        stored.undeployed = true;
        let sysdata = context.data_service().get_collection(SYSDATA).await?;
        sysdata
            .update(BUSINESS_NETWORK_KEY, serde_json::to_value(&stored)?)
            .await?;
        info!(hash = %stored.hash, "Business network undeployed");
        Ok(Value::Null)
    }
}

async fn read_stored(context: &Context) -> Result<StoredNetwork> {
    let sysdata = context.data_service().get_collection(SYSDATA).await?;
    Ok(serde_json::from_value(sysdata.get(BUSINESS_NETWORK_KEY).await?)?)
}

/// `Transaction:default` plus one registry per declared type.
async fn ensure_default_registries(context: &Context) -> Result<()> {
    let registries = context.registry_manager()?;
    registries
        .ensure(
            RegistryType::Transaction,
            DEFAULT_TRANSACTION_REGISTRY,
            "Default transaction registry",
        )
        .await?;
    registries.create_defaults(false).await
}
