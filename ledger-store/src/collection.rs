//! DataCollection - a named set of JSON objects keyed by ID.

use serde_json::Value;

use crate::action::Action;
use crate::error::{Result, StoreError};
use crate::service::DataService;

/// Handle to one collection of a [`DataService`].
///
/// All writes go through the service's `handle_action`.
#[derive(Clone)]
pub struct DataCollection {
    service: DataService,
    id: String,
}

impl DataCollection {
    pub(crate) fn new(service: DataService, id: &str) -> Self {
        Self {
            service,
            id: id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Every object in the collection, in backend order.
    pub async fn get_all(&self) -> Result<Vec<Value>> {
        self.service.read_all(&self.id).await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.service
            .read_object(&self.id, id)
            .await?
            .ok_or_else(|| StoreError::object_not_found(&self.id, id))
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.service.read_object(&self.id, id).await?.is_some())
    }

    /// Add an object. Without `force`, an existing ID is an error.
    pub async fn add(&self, id: &str, object: Value, force: bool) -> Result<()> {
        if !force && self.exists(id).await? {
            return Err(StoreError::duplicate_object(&self.id, id));
        }
        self.service
            .handle_action(Action::Insert {
                collection: self.id.clone(),
                id: id.to_string(),
                object,
                force,
            })
            .await
    }

    pub async fn update(&self, id: &str, object: Value) -> Result<()> {
        if !self.exists(id).await? {
            return Err(StoreError::object_not_found(&self.id, id));
        }
        self.service
            .handle_action(Action::Replace {
                collection: self.id.clone(),
                id: id.to_string(),
                object,
            })
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        if !self.exists(id).await? {
            return Err(StoreError::object_not_found(&self.id, id));
        }
        self.service
            .handle_action(Action::Remove {
                collection: self.id.clone(),
                id: id.to_string(),
            })
            .await
    }

    /// Remove every object but keep the collection.
    pub async fn clear(&self) -> Result<()> {
        self.service
            .handle_actions(vec![
                Action::DeleteCollection {
                    id: self.id.clone(),
                },
                Action::CreateCollection {
                    id: self.id.clone(),
                    force: false,
                },
            ])
            .await
    }
}

impl std::fmt::Debug for DataCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCollection")
            .field("id", &self.id)
            .field("backend", &self.service.backend_name())
            .finish()
    }
}
