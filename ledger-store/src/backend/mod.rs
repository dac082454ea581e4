//! Storage backend trait and implementations.
//!
//! A backend only supplies primitives. Existence checks, staging and the
//! write queue live in [`DataService`](crate::DataService), so every backend
//! gets the same error semantics and the same single-writer discipline.

pub mod document;
pub mod fs;
pub mod memory;

pub use document::{SledBackend, SledConfig};
pub use fs::FsBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use serde_json::Value;

use crate::action::Action;
use crate::error::{Result, StoreError};

/// Primitive operations a storage backend must provide.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend name (e.g. "memory", "sled", "fs")
    fn name(&self) -> &str;

    /// Open the underlying storage handle.
    async fn open(&self) -> Result<()>;

    /// Flush and release the storage handle.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Whether a collection exists.
    async fn has_collection(&self, id: &str) -> Result<bool>;

    /// Read one object, `None` when absent.
    async fn read_object(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Read every object in a collection as `(id, object)` pairs.
    async fn read_all(&self, collection: &str) -> Result<Vec<(String, Value)>>;

    /// Apply one mutation. Only the write queue calls this.
    ///
    /// Implementations must re-check existence here: the checks done by the
    /// caller before enqueueing are advisory.
    async fn apply(&self, action: &Action) -> Result<()>;

    /// Delete every collection and object.
    async fn remove_all_data(&self) -> Result<()> {
        Err(StoreError::AbstractMethod {
            backend: self.name().to_string(),
            method: "remove_all_data",
        })
    }
}
