//! Cooperative cancellation and time limits for engine calls.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{Result, RuntimeError};

/// Lets the caller abandon an in-flight call.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the engine while a call runs.
#[derive(Debug, Clone)]
pub struct CallToken {
    rx: watch::Receiver<bool>,
}

impl CallToken {
    pub fn pair() -> (CancelHandle, CallToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CallToken { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the call is cancelled; never if the handle is dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Run `work` until it finishes, the token is cancelled or `limit` elapses.
pub async fn supervise<T, F>(work: F, token: &CallToken, limit: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let guarded = async {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RuntimeError::Cancelled),
            result = work => result,
        }
    };
    match limit {
        Some(limit) => tokio::time::timeout(limit, guarded)
            .await
            .unwrap_or_else(|_| Err(RuntimeError::TimedOut(limit.as_millis() as u64))),
        None => guarded.await,
    }
}
