//! DataService - the storage facade used by the runtime.
//!
//! A `DataService` owns one backend and one write queue. Cloning it is
//! cheap and shares everything; [`DataService::session`] hands out a view
//! with its own transaction state so concurrent calls cannot see each
//! other's staged writes.
//!
//! # Write path
//!
//! ```text
//!  DataCollection::add ─┐
//!  create_collection  ──┼─► handle_action ─┬─► autocommit: WriteQueue ─► backend.apply
//!  delete_collection  ──┘                  └─► deferred:   Staging ──(prepare)──┘
//! ```

use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::action::Action;
use crate::backend::{MemoryBackend, StorageBackend};
use crate::collection::DataCollection;
use crate::error::{Result, StoreError};
use crate::queue::WriteQueue;
use crate::staging::Staging;
use serde_json::Value;

/// Options fixed when a DataService is constructed.
#[derive(Debug, Clone)]
pub struct DataServiceOptions {
    /// Apply each action as soon as it is handled. When off, actions made
    /// inside a transaction are staged until `transaction_prepare`.
    pub autocommit: bool,
    /// Capacity of the write queue channel
    pub queue_depth: usize,
}

impl Default for DataServiceOptions {
    fn default() -> Self {
        Self {
            autocommit: true,
            queue_depth: 256,
        }
    }
}

struct Shared {
    backend: Arc<dyn StorageBackend>,
    queue: WriteQueue,
    connected: OnceCell<()>,
    options: DataServiceOptions,
}

#[derive(Default)]
struct SessionState {
    in_transaction: bool,
    read_only: bool,
    staging: Staging,
}

/// Collection-oriented storage over a pluggable backend.
#[derive(Clone)]
pub struct DataService {
    shared: Arc<Shared>,
    session: Arc<Mutex<SessionState>>,
}

impl DataService {
    /// Create a service over `backend`. Spawns the write queue worker, so it
    /// must be called from within a tokio runtime.
    pub fn new(backend: Arc<dyn StorageBackend>, options: DataServiceOptions) -> Self {
        let queue = WriteQueue::spawn(backend.clone(), options.queue_depth);
        info!(
            backend = backend.name(),
            autocommit = options.autocommit,
            "DataService created"
        );
        Self {
            shared: Arc::new(Shared {
                backend,
                queue,
                connected: OnceCell::new(),
                options,
            }),
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// In-memory service with default options.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), DataServiceOptions::default())
    }

    /// A view sharing the backend and write queue with fresh transaction state.
    pub fn session(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.shared.backend.name()
    }

    pub fn autocommit(&self) -> bool {
        self.shared.options.autocommit
    }

    /// Number of actions the write queue has applied.
    pub fn applied_actions(&self) -> u64 {
        self.shared.queue.applied()
    }

    /// Number of actions staged in this session.
    pub async fn pending_actions(&self) -> usize {
        self.session.lock().await.staging.len()
    }

    /// Open the backend once; concurrent first callers share one open.
    pub async fn ensure_connected(&self) -> Result<()> {
        let backend = &self.shared.backend;
        self.shared
            .connected
            .get_or_try_init(|| async {
                backend.open().await?;
                debug!(backend = backend.name(), "Storage connected");
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Flush and release the backend.
    pub async fn close(&self) -> Result<()> {
        self.shared.backend.close().await
    }

    /// Create a collection. Without `force`, an existing collection is an error.
    pub async fn create_collection(&self, id: &str, force: bool) -> Result<DataCollection> {
        validate_id(id)?;
        if !force && self.exists_collection(id).await? {
            return Err(StoreError::DuplicateCollection(id.to_string()));
        }
        self.handle_action(Action::CreateCollection {
            id: id.to_string(),
            force,
        })
        .await?;
        debug!(collection = %id, "Collection created");
        Ok(DataCollection::new(self.clone(), id))
    }

    /// Delete a collection and every object in it.
    pub async fn delete_collection(&self, id: &str) -> Result<()> {
        if !self.exists_collection(id).await? {
            return Err(StoreError::CollectionNotFound(id.to_string()));
        }
        self.handle_action(Action::DeleteCollection { id: id.to_string() })
            .await?;
        debug!(collection = %id, "Collection deleted");
        Ok(())
    }

    pub async fn get_collection(&self, id: &str) -> Result<DataCollection> {
        if !self.exists_collection(id).await? {
            return Err(StoreError::CollectionNotFound(id.to_string()));
        }
        Ok(DataCollection::new(self.clone(), id))
    }

    /// Get a collection, creating it when it does not exist yet.
    pub async fn ensure_collection(&self, id: &str) -> Result<DataCollection> {
        if self.exists_collection(id).await? {
            return Ok(DataCollection::new(self.clone(), id));
        }
        self.create_collection(id, false).await
    }

    pub async fn exists_collection(&self, id: &str) -> Result<bool> {
        self.ensure_connected().await?;
        if let Some(staged) = self.session.lock().await.staging.collection(id) {
            return Ok(staged);
        }
        self.shared.backend.has_collection(id).await
    }

    /// Delete every collection in the store.
    pub async fn remove_all_data(&self) -> Result<()> {
        self.ensure_connected().await?;
        self.session.lock().await.staging.clear();
        self.shared.queue.remove_all().await?;
        info!(backend = self.backend_name(), "All data removed");
        Ok(())
    }

    /// The single entry point for mutations.
    pub async fn handle_action(&self, action: Action) -> Result<()> {
        self.handle_actions(vec![action]).await
    }

    /// Handle several actions; with autocommit they form one queue batch.
    pub async fn handle_actions(&self, actions: Vec<Action>) -> Result<()> {
        self.ensure_connected().await?;
        {
            let mut session = self.session.lock().await;
            if session.read_only {
                let collection = actions
                    .first()
                    .map(|a| a.collection().to_string())
                    .unwrap_or_default();
                return Err(StoreError::ReadOnly(collection));
            }
            if session.in_transaction && !self.shared.options.autocommit {
                for action in actions {
                    debug!(action = action.kind(), collection = %action.collection(), "Action staged");
                    session.staging.record(action);
                }
                return Ok(());
            }
        }
        self.shared.queue.submit(actions).await
    }

    pub(crate) async fn read_object(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.ensure_connected().await?;
        if let Some(staged) = self.session.lock().await.staging.object(collection, id) {
            return Ok(staged);
        }
        self.shared.backend.read_object(collection, id).await
    }

    pub(crate) async fn read_all(&self, collection: &str) -> Result<Vec<Value>> {
        self.ensure_connected().await?;
        let stored = self.shared.backend.read_all(collection).await?;
        Ok(self.session.lock().await.staging.merge(collection, stored))
    }

    /// Begin a transaction; staged state from an earlier call is dropped.
    pub async fn transaction_start(&self, read_only: bool) -> Result<()> {
        let mut session = self.session.lock().await;
        session.staging.clear();
        session.in_transaction = true;
        session.read_only = read_only;
        debug!(read_only, "Data transaction started");
        Ok(())
    }

    /// Push staged actions through the write queue as one batch.
    pub async fn transaction_prepare(&self) -> Result<()> {
        let actions = self.session.lock().await.staging.take();
        if actions.is_empty() {
            return Ok(());
        }
        let count = actions.len();
        self.shared.queue.submit(actions).await?;
        debug!(count, "Staged actions committed");
        Ok(())
    }

    pub async fn transaction_commit(&self) -> Result<()> {
        Ok(())
    }

    /// Discard staged actions.
    pub async fn transaction_rollback(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let discarded = session.staging.len();
        session.staging.clear();
        if discarded > 0 {
            debug!(discarded, "Staged actions discarded");
        }
        Ok(())
    }

    pub async fn transaction_end(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.staging.clear();
        session.in_transaction = false;
        session.read_only = false;
        Ok(())
    }
}

impl std::fmt::Debug for DataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("backend", &self.backend_name())
            .field("autocommit", &self.autocommit())
            .field("connected", &self.shared.connected.initialized())
            .finish()
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('\0') {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}
