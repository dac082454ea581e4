use serde_json::{json, Value};

use super::Engine;
use crate::context::Context;
use crate::error::Result;
use crate::resource::Resource;

impl Engine {
    /// Runtime version and the caller's participant.
    pub(super) async fn ping(&self, context: &mut Context) -> Result<Value> {
        Ok(json!({
            "version": context.container().version(),
            "participant": context.participant().map(Resource::fqi),
        }))
    }

    pub(super) async fn get_log_level(&self, context: &mut Context) -> Result<Value> {
        let level = context.container().logging_service().level().await;
        Ok(Value::String(level))
    }

    pub(super) async fn set_log_level(&self, context: &mut Context, level: &str) -> Result<Value> {
        context
            .container()
            .logging_service()
            .set_level(level)
            .await?;
        Ok(Value::Null)
    }
}
