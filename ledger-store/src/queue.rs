//! Serialized write queue.
//!
//! One worker task per [`DataService`](crate::DataService) owns the write
//! side of the backend. Callers enqueue a batch and wait for the reply; the
//! worker applies batches strictly one at a time, in arrival order. A batch
//! that has been enqueued is applied even if the caller stops waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::action::Action;
use crate::backend::StorageBackend;
use crate::error::{Result, StoreError};

enum Job {
    Apply {
        actions: Vec<Action>,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveAll {
        reply: oneshot::Sender<Result<()>>,
    },
}

#[derive(Clone)]
pub(crate) struct WriteQueue {
    tx: mpsc::Sender<Job>,
    applied: Arc<AtomicU64>,
}

impl WriteQueue {
    /// Start the worker. Must be called from within a tokio runtime.
    pub(crate) fn spawn(backend: Arc<dyn StorageBackend>, depth: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(depth.max(1));
        let applied = Arc::new(AtomicU64::new(0));
        let counter = applied.clone();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Apply { actions, reply } => {
                        let result = apply_batch(backend.as_ref(), &actions, &counter).await;
                        let _ = reply.send(result);
                    }
                    Job::RemoveAll { reply } => {
                        let _ = reply.send(backend.remove_all_data().await);
                    }
                }
            }
            debug!(backend = backend.name(), "Write queue closed");
        });

        Self { tx, applied }
    }

    /// Enqueue a batch and wait until it has been applied.
    pub(crate) async fn submit(&self, actions: Vec<Action>) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job::Apply { actions, reply })
            .await
            .map_err(|_| StoreError::QueueClosed)?;
        rx.await.map_err(|_| StoreError::QueueClosed)?
    }

    pub(crate) async fn remove_all(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job::RemoveAll { reply })
            .await
            .map_err(|_| StoreError::QueueClosed)?;
        rx.await.map_err(|_| StoreError::QueueClosed)?
    }

    /// Total number of actions applied so far.
    pub(crate) fn applied(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }
}

/// Apply actions in order, stopping at the first failure.
async fn apply_batch(
    backend: &dyn StorageBackend,
    actions: &[Action],
    counter: &AtomicU64,
) -> Result<()> {
    for (index, action) in actions.iter().enumerate() {
        if let Err(e) = backend.apply(action).await {
            warn!(
                backend = backend.name(),
                action = action.kind(),
                collection = %action.collection(),
                applied = index,
                remaining = actions.len() - index,
                error = %e,
                "Write batch stopped"
            );
            return Err(e);
        }
        counter.fetch_add(1, Ordering::SeqCst);
    }
    debug!(backend = backend.name(), count = actions.len(), "Write batch applied");
    Ok(())
}
