//! Filesystem backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! collections/
//!   <hex(collection id)>/
//!     .collection                 marker holding the raw collection id
//!     <hex(object id)>.json       one file per object
//!     sha256-<digest>.json        long object id: { "id", "object" }
//! ```
//!
//! IDs are hex-encoded so characters such as `:` and `$` never reach the
//! filesystem. Object IDs whose encoding would not fit a filename are
//! named by their SHA-256 digest instead, and the raw ID is kept inside the
//! file. Object files are written to a temp file and renamed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::StorageBackend;
use crate::action::Action;
use crate::error::{Result, StoreError};

const MARKER: &str = ".collection";
const OBJECT_EXT: &str = "json";
/// Longest hex stem used as a filename; leaves room for temp suffixes.
const MAX_ENCODED_STEM: usize = 200;
const HASHED_PREFIX: &str = "sha256-";

/// File body for an object named by digest.
#[derive(Serialize, Deserialize)]
struct LongIdObject {
    id: String,
    object: Value,
}

fn object_stem(id: &str) -> String {
    let encoded = hex::encode(id);
    if encoded.len() <= MAX_ENCODED_STEM {
        encoded
    } else {
        format!("{HASHED_PREFIX}{}", hex::encode(Sha256::digest(id.as_bytes())))
    }
}

fn is_hashed(stem: &str) -> bool {
    stem.starts_with(HASHED_PREFIX)
}

/// Directory-per-collection, file-per-object store
pub struct FsBackend {
    root_dir: PathBuf,
}

impl FsBackend {
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn collections_dir(&self) -> PathBuf {
        self.root_dir.join("collections")
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.collections_dir().join(hex::encode(collection))
    }

    fn object_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.{}", object_stem(id), OBJECT_EXT))
    }

    async fn exists(path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    async fn require_collection(&self, collection: &str) -> Result<()> {
        if Self::exists(&self.collection_dir(collection).join(MARKER)).await {
            Ok(())
        } else {
            Err(StoreError::CollectionNotFound(collection.to_string()))
        }
    }

    async fn write_object(&self, collection: &str, id: &str, object: &Value) -> Result<()> {
        let path = self.object_path(collection, id);
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        let bytes = if is_hashed(&object_stem(id)) {
            serde_json::to_vec(&LongIdObject {
                id: id.to_string(),
                object: object.clone(),
            })?
        } else {
            serde_json::to_vec(object)?
        };
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn object_file_stem(path: &Path) -> Option<&str> {
        if path.extension().and_then(|e| e.to_str()) != Some(OBJECT_EXT) {
            return None;
        }
        path.file_stem()?.to_str()
    }

    /// `(id, object)` from a file's name and contents.
    fn decode_object(stem: &str, bytes: &[u8]) -> Result<Option<(String, Value)>> {
        if is_hashed(stem) {
            let stored: LongIdObject = serde_json::from_slice(bytes)?;
            return Ok(Some((stored.id, stored.object)));
        }
        let Some(id) = hex::decode(stem).ok().and_then(|b| String::from_utf8(b).ok()) else {
            return Ok(None);
        };
        Ok(Some((id, serde_json::from_slice(bytes)?)))
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    fn name(&self) -> &str {
        "fs"
    }

    async fn open(&self) -> Result<()> {
        fs::create_dir_all(self.collections_dir()).await?;
        info!(path = %self.root_dir.display(), "Filesystem backend opened");
        Ok(())
    }

    async fn has_collection(&self, id: &str) -> Result<bool> {
        Ok(Self::exists(&self.collection_dir(id).join(MARKER)).await)
    }

    async fn read_object(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        match fs::read(self.object_path(collection, id)).await {
            Ok(bytes) if is_hashed(&object_stem(id)) => {
                let stored: LongIdObject = serde_json::from_slice(&bytes)?;
                Ok(Some(stored.object))
            }
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let dir = self.collection_dir(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(stem) = Self::object_file_stem(&path) else {
                continue;
            };
            match fs::read(&path).await {
                Ok(bytes) => {
                    if let Some(row) = Self::decode_object(stem, &bytes)? {
                        rows.push(row);
                    }
                }
                // removed between listing and reading
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "Object vanished during scan");
                }
                Err(e) => return Err(e.into()),
            }
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    async fn apply(&self, action: &Action) -> Result<()> {
        match action {
            Action::CreateCollection { id, force } => {
                let dir = self.collection_dir(id);
                if Self::exists(&dir.join(MARKER)).await {
                    if !force {
                        return Err(StoreError::DuplicateCollection(id.clone()));
                    }
                    return Ok(());
                }
                fs::create_dir_all(&dir).await?;
                fs::write(dir.join(MARKER), id.as_bytes()).await?;
            }
            Action::DeleteCollection { id } => {
                self.require_collection(id).await?;
                fs::remove_dir_all(self.collection_dir(id)).await?;
                debug!(collection = %id, "Collection directory removed");
            }
            Action::Insert {
                collection,
                id,
                object,
                force,
            } => {
                self.require_collection(collection).await?;
                if !force && Self::exists(&self.object_path(collection, id)).await {
                    return Err(StoreError::duplicate_object(collection, id));
                }
                self.write_object(collection, id, object).await?;
            }
            Action::Replace {
                collection,
                id,
                object,
            } => {
                self.require_collection(collection).await?;
                if !Self::exists(&self.object_path(collection, id)).await {
                    return Err(StoreError::object_not_found(collection, id));
                }
                self.write_object(collection, id, object).await?;
            }
            Action::Remove { collection, id } => {
                self.require_collection(collection).await?;
                match fs::remove_file(self.object_path(collection, id)).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(StoreError::object_not_found(collection, id));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    async fn remove_all_data(&self) -> Result<()> {
        let dir = self.collections_dir();
        if Self::exists(&dir).await {
            fs::remove_dir_all(&dir).await?;
        }
        fs::create_dir_all(&dir).await?;
        Ok(())
    }
}
