//! Sled-backed document store.
//!
//! Collections are markers in the `collections` tree. Objects live in the
//! `objects` tree under the composite key `{collection}\0{id}`, so listing
//! or deleting a collection is a single prefix scan.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::StorageBackend;
use crate::action::Action;
use crate::error::{Result, StoreError};

const KEY_SEPARATOR: u8 = 0;

/// Configuration for the sled backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SledConfig {
    /// Path to the sled database directory
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Page cache size in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Delete the database when it is dropped (tests)
    #[serde(default)]
    pub temporary: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from("./ledger-data/store.sled")
}

fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024 // 64MB
}

impl Default for SledConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            cache_capacity: default_cache_capacity(),
            temporary: false,
        }
    }
}

struct Handles {
    db: sled::Db,
    collections: sled::Tree,
    objects: sled::Tree,
}

/// Document store backed by sled
pub struct SledBackend {
    config: SledConfig,
    handles: OnceCell<Handles>,
}

impl SledBackend {
    pub fn new(config: SledConfig) -> Self {
        Self {
            config,
            handles: OnceCell::new(),
        }
    }

    /// A throwaway database removed on drop.
    pub fn temporary() -> Self {
        Self::new(SledConfig {
            temporary: true,
            ..Default::default()
        })
    }

    fn handles(&self) -> Result<&Handles> {
        self.handles
            .get()
            .ok_or_else(|| StoreError::NotConnected(self.name().to_string()))
    }

    fn object_key(collection: &str, id: &str) -> Vec<u8> {
        let mut key = Self::collection_prefix(collection);
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn collection_prefix(collection: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(collection.len() + 1);
        prefix.extend_from_slice(collection.as_bytes());
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    fn require_collection(handles: &Handles, collection: &str) -> Result<()> {
        if handles.collections.contains_key(collection.as_bytes())? {
            Ok(())
        } else {
            Err(StoreError::CollectionNotFound(collection.to_string()))
        }
    }
}

#[async_trait]
impl StorageBackend for SledBackend {
    fn name(&self) -> &str {
        "sled"
    }

    async fn open(&self) -> Result<()> {
        let config = &self.config;
        self.handles
            .get_or_try_init(|| async {
                let mut sled_config = sled::Config::new()
                    .cache_capacity(config.cache_capacity)
                    .mode(sled::Mode::HighThroughput);
                if config.temporary {
                    sled_config = sled_config.temporary(true);
                } else {
                    if let Some(parent) = config.path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    sled_config = sled_config.path(&config.path);
                }

                let db = sled_config.open()?;
                let collections = db.open_tree("collections")?;
                let objects = db.open_tree("objects")?;

                info!(
                    path = %config.path.display(),
                    temporary = config.temporary,
                    "Sled backend opened"
                );
                Ok::<_, StoreError>(Handles {
                    db,
                    collections,
                    objects,
                })
            })
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(handles) = self.handles.get() {
            handles.db.flush_async().await?;
            debug!("Sled backend flushed");
        }
        Ok(())
    }

    async fn has_collection(&self, id: &str) -> Result<bool> {
        Ok(self.handles()?.collections.contains_key(id.as_bytes())?)
    }

    async fn read_object(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let handles = self.handles()?;
        match handles.objects.get(Self::object_key(collection, id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let handles = self.handles()?;
        let prefix = Self::collection_prefix(collection);
        let mut rows = Vec::new();
        for item in handles.objects.scan_prefix(&prefix) {
            let (key, bytes) = item?;
            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            rows.push((id, serde_json::from_slice(&bytes)?));
        }
        Ok(rows)
    }

    async fn apply(&self, action: &Action) -> Result<()> {
        let handles = self.handles()?;
        match action {
            Action::CreateCollection { id, force } => {
                if handles.collections.contains_key(id.as_bytes())? && !force {
                    return Err(StoreError::DuplicateCollection(id.clone()));
                }
                handles.collections.insert(id.as_bytes(), id.as_bytes())?;
            }
            Action::DeleteCollection { id } => {
                if handles.collections.remove(id.as_bytes())?.is_none() {
                    return Err(StoreError::CollectionNotFound(id.clone()));
                }
                let mut batch = sled::Batch::default();
                let mut removed = 0usize;
                for key in handles.objects.scan_prefix(Self::collection_prefix(id)).keys() {
                    batch.remove(key?);
                    removed += 1;
                }
                handles.objects.apply_batch(batch)?;
                debug!(collection = %id, removed, "Collection deleted");
            }
            Action::Insert {
                collection,
                id,
                object,
                force,
            } => {
                Self::require_collection(handles, collection)?;
                let key = Self::object_key(collection, id);
                if !force && handles.objects.contains_key(&key)? {
                    return Err(StoreError::duplicate_object(collection, id));
                }
                handles.objects.insert(key, serde_json::to_vec(object)?)?;
            }
            Action::Replace {
                collection,
                id,
                object,
            } => {
                Self::require_collection(handles, collection)?;
                let key = Self::object_key(collection, id);
                if !handles.objects.contains_key(&key)? {
                    return Err(StoreError::object_not_found(collection, id));
                }
                handles.objects.insert(key, serde_json::to_vec(object)?)?;
            }
            Action::Remove { collection, id } => {
                Self::require_collection(handles, collection)?;
                if handles
                    .objects
                    .remove(Self::object_key(collection, id))?
                    .is_none()
                {
                    return Err(StoreError::object_not_found(collection, id));
                }
            }
        }
        Ok(())
    }

    async fn remove_all_data(&self) -> Result<()> {
        let handles = self.handles()?;
        handles.collections.clear()?;
        handles.objects.clear()?;
        Ok(())
    }
}
