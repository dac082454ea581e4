//! Storage mutations.
//!
//! Every change to a store is expressed as an [`Action`] and applied by the
//! write queue. Backends never mutate state outside of `apply`.

use serde_json::Value;

/// A single storage mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Create a collection; with `force`, an existing collection is kept as is.
    CreateCollection { id: String, force: bool },
    /// Delete a collection and every object it contains.
    DeleteCollection { id: String },
    /// Add an object; with `force`, an existing object is overwritten.
    Insert {
        collection: String,
        id: String,
        object: Value,
        force: bool,
    },
    /// Overwrite an existing object.
    Replace {
        collection: String,
        id: String,
        object: Value,
    },
    /// Remove an existing object.
    Remove { collection: String, id: String },
}

impl Action {
    /// The collection this action touches.
    pub fn collection(&self) -> &str {
        match self {
            Action::CreateCollection { id, .. } | Action::DeleteCollection { id } => id,
            Action::Insert { collection, .. }
            | Action::Replace { collection, .. }
            | Action::Remove { collection, .. } => collection,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateCollection { .. } => "create_collection",
            Action::DeleteCollection { .. } => "delete_collection",
            Action::Insert { .. } => "insert",
            Action::Replace { .. } => "replace",
            Action::Remove { .. } => "remove",
        }
    }
}
