//! Error types for ledger-store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object with ID '{id}' in collection with ID '{collection_id}' does not exist")]
    ObjectNotFound { collection_id: String, id: String },

    #[error("Collection with ID '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("Failed to add object with ID '{id}' as the object already exists")]
    DuplicateObject { collection_id: String, id: String },

    #[error("Failed to add collection with ID '{0}' as the collection already exists")]
    DuplicateCollection(String),

    #[error("Abstract function called: storage backend '{backend}' does not implement {method}")]
    AbstractMethod {
        backend: String,
        method: &'static str,
    },

    #[error("Cannot modify collection '{0}' in a read-only transaction")]
    ReadOnly(String),

    #[error("Invalid identifier '{0}'")]
    InvalidId(String),

    #[error("Storage backend '{0}' is not connected")]
    NotConnected(String),

    #[error("Write queue has shut down")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
}

impl StoreError {
    pub(crate) fn object_not_found(collection_id: &str, id: &str) -> Self {
        Self::ObjectNotFound {
            collection_id: collection_id.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate_object(collection_id: &str, id: &str) -> Self {
        Self::DuplicateObject {
            collection_id: collection_id.to_string(),
            id: id.to_string(),
        }
    }

    /// True for the "does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. } | Self::CollectionNotFound(_))
    }

    /// True for the "already exists" family of errors.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateObject { .. } | Self::DuplicateCollection(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
