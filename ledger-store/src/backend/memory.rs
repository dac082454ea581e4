//! In-memory backend.
//!
//! Two tables, like a browser IndexedDB layout: `collections` keyed by ID
//! and `objects` keyed by `(collection_id, id)`. Deleting a collection
//! range-deletes its slice of the objects table.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::StorageBackend;
use crate::action::Action;
use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
struct Tables {
    collections: BTreeSet<String>,
    objects: BTreeMap<(String, String), Value>,
}

impl Tables {
    fn object_range<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = (&'a (String, String), &'a Value)> + 'a {
        let start = (collection.to_string(), String::new());
        self.objects
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |((c, _), _)| c == collection)
    }

    fn require_collection(&self, collection: &str) -> Result<()> {
        if self.collections.contains(collection) {
            Ok(())
        } else {
            Err(StoreError::CollectionNotFound(collection.to_string()))
        }
    }
}

/// Volatile backend, mainly for embedded use and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    open: AtomicBool,
    open_count: AtomicU32,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `open` has been called.
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Number of stored objects across all collections.
    pub async fn object_count(&self) -> usize {
        self.tables.read().await.objects.len()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open(&self) -> Result<()> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        debug!("Memory backend opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn has_collection(&self, id: &str) -> Result<bool> {
        Ok(self.tables.read().await.collections.contains(id))
    }

    async fn read_object(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .objects
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .object_range(collection)
            .map(|((_, id), value)| (id.clone(), value.clone()))
            .collect())
    }

    async fn apply(&self, action: &Action) -> Result<()> {
        let mut tables = self.tables.write().await;
        match action {
            Action::CreateCollection { id, force } => {
                if !tables.collections.insert(id.clone()) && !force {
                    return Err(StoreError::DuplicateCollection(id.clone()));
                }
            }
            Action::DeleteCollection { id } => {
                if !tables.collections.remove(id) {
                    return Err(StoreError::CollectionNotFound(id.clone()));
                }
                let keys: Vec<(String, String)> =
                    tables.object_range(id).map(|(key, _)| key.clone()).collect();
                for key in keys {
                    tables.objects.remove(&key);
                }
            }
            Action::Insert {
                collection,
                id,
                object,
                force,
            } => {
                tables.require_collection(collection)?;
                let key = (collection.clone(), id.clone());
                if !force && tables.objects.contains_key(&key) {
                    return Err(StoreError::duplicate_object(collection, id));
                }
                tables.objects.insert(key, object.clone());
            }
            Action::Replace {
                collection,
                id,
                object,
            } => {
                tables.require_collection(collection)?;
                match tables.objects.get_mut(&(collection.clone(), id.clone())) {
                    Some(slot) => *slot = object.clone(),
                    None => return Err(StoreError::object_not_found(collection, id)),
                }
            }
            Action::Remove { collection, id } => {
                tables.require_collection(collection)?;
                if tables
                    .objects
                    .remove(&(collection.clone(), id.clone()))
                    .is_none()
                {
                    return Err(StoreError::object_not_found(collection, id));
                }
            }
        }
        Ok(())
    }

    async fn remove_all_data(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.collections.clear();
        tables.objects.clear();
        Ok(())
    }
}
