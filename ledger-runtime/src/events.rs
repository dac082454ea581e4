//! Event publication.
//!
//! Events emitted during a call are buffered and only published when the
//! call commits; a rollback drops them.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct EventService {
    sender: broadcast::Sender<Value>,
    pending: Arc<Mutex<Vec<Value>>>,
}

impl EventService {
    pub fn new(sender: broadcast::Sender<Value>) -> Self {
        Self {
            sender,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn emit(&self, event: Value) -> Result<()> {
        self.pending.lock().await.push(event);
        Ok(())
    }

    pub async fn transaction_start(&self, _read_only: bool) -> Result<()> {
        self.pending.lock().await.clear();
        Ok(())
    }

    pub async fn transaction_prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Publish buffered events in emission order.
    pub async fn transaction_commit(&self) -> Result<()> {
        let events = std::mem::take(&mut *self.pending.lock().await);
        let count = events.len();
        for event in events {
            // no subscribers is not an error
            let _ = self.sender.send(event);
        }
        if count > 0 {
            debug!(count, "Events published");
        }
        Ok(())
    }

    pub async fn transaction_rollback(&self) -> Result<()> {
        self.pending.lock().await.clear();
        Ok(())
    }

    pub async fn transaction_end(&self) -> Result<()> {
        self.pending.lock().await.clear();
        Ok(())
    }
}
