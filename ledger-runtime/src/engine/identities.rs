use serde_json::Value;

use super::Engine;
use crate::context::Context;
use crate::error::Result;
use crate::identity::DEFAULT_ISSUER;
use crate::resource::Relationship;

impl Engine {
    /// Issue `name` for a participant. The issuer is the caller's issuer.
    pub(super) async fn issue_identity(
        &self,
        context: &mut Context,
        participant: &Relationship,
        name: &str,
    ) -> Result<Value> {
        let issuer = context
            .identity()
            .issuer()
            .unwrap_or(DEFAULT_ISSUER)
            .to_string();
        let record = context
            .identity_manager()?
            .issue(participant, name, &issuer)
            .await?;
        Ok(serde_json::to_value(record)?)
    }

    pub(super) async fn bind_identity(
        &self,
        context: &mut Context,
        participant: &Relationship,
        certificate: &str,
    ) -> Result<Value> {
        let record = context
            .identity_manager()?
            .bind(participant, certificate)
            .await?;
        Ok(serde_json::to_value(record)?)
    }

    pub(super) async fn activate_identity(&self, context: &mut Context) -> Result<Value> {
        let record = context
            .identity_manager()?
            .activate(context.identity())
            .await?;
        Ok(serde_json::to_value(record)?)
    }

    pub(super) async fn revoke_identity(&self, context: &mut Context, identity_id: &str) -> Result<Value> {
        let record = context.identity_manager()?.revoke(identity_id).await?;
        Ok(serde_json::to_value(record)?)
    }
}
