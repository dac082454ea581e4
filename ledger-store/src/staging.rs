//! Deferred writes for a non-autocommit session.
//!
//! Staged actions are kept in order for the eventual commit, plus two views
//! used to answer reads made by the same session before it commits.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::action::Action;

#[derive(Debug, Default)]
pub(crate) struct Staging {
    actions: Vec<Action>,
    /// `true` when created, `false` when deleted in this session
    collections: HashMap<String, bool>,
    /// Collections deleted in this session; stored objects are hidden
    cleared: HashSet<String>,
    /// `None` marks a staged removal
    objects: HashMap<(String, String), Option<Value>>,
}

impl Staging {
    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }

    pub(crate) fn record(&mut self, action: Action) {
        match &action {
            Action::CreateCollection { id, .. } => {
                self.collections.insert(id.clone(), true);
            }
            Action::DeleteCollection { id } => {
                self.collections.insert(id.clone(), false);
                self.cleared.insert(id.clone());
                self.objects.retain(|(collection, _), _| collection != id);
            }
            Action::Insert {
                collection,
                id,
                object,
                ..
            }
            | Action::Replace {
                collection,
                id,
                object,
            } => {
                self.objects
                    .insert((collection.clone(), id.clone()), Some(object.clone()));
            }
            Action::Remove { collection, id } => {
                self.objects.insert((collection.clone(), id.clone()), None);
            }
        }
        self.actions.push(action);
    }

    /// Staged existence of a collection, `None` when this session has not touched it.
    pub(crate) fn collection(&self, id: &str) -> Option<bool> {
        self.collections.get(id).copied()
    }

    /// Staged state of an object, `None` when the backend must be consulted.
    pub(crate) fn object(&self, collection: &str, id: &str) -> Option<Option<Value>> {
        if let Some(staged) = self.objects.get(&(collection.to_string(), id.to_string())) {
            return Some(staged.clone());
        }
        if self.cleared.contains(collection) {
            return Some(None);
        }
        None
    }

    /// Overlay staged writes onto the rows read from the backend.
    pub(crate) fn merge(&self, collection: &str, stored: Vec<(String, Value)>) -> Vec<Value> {
        let base = if self.cleared.contains(collection) {
            Vec::new()
        } else {
            stored
        };

        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(base.len());
        for (id, value) in base {
            let key = (collection.to_string(), id);
            match self.objects.get(&key) {
                Some(Some(staged)) => merged.push(staged.clone()),
                Some(None) => {}
                None => merged.push(value),
            }
            seen.insert(key.1);
        }

        let mut added: Vec<(&String, &Value)> = self
            .objects
            .iter()
            .filter(|((c, id), _)| c == collection && !seen.contains(id))
            .filter_map(|((_, id), v)| v.as_ref().map(|v| (id, v)))
            .collect();
        added.sort_by(|a, b| a.0.cmp(b.0));
        merged.extend(added.into_iter().map(|(_, v)| v.clone()));
        merged
    }

    /// Remove and return the staged actions in order.
    pub(crate) fn take(&mut self) -> Vec<Action> {
        let actions = std::mem::take(&mut self.actions);
        self.clear();
        actions
    }

    pub(crate) fn clear(&mut self) {
        self.actions.clear();
        self.collections.clear();
        self.cleared.clear();
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_applies_overlay() {
        let mut staging = Staging::default();
        staging.record(Action::Replace {
            collection: "c".into(),
            id: "1".into(),
            object: json!({ "v": "new" }),
        });
        staging.record(Action::Remove {
            collection: "c".into(),
            id: "2".into(),
        });
        staging.record(Action::Insert {
            collection: "c".into(),
            id: "3".into(),
            object: json!({ "v": 3 }),
            force: false,
        });

        let stored = vec![
            ("1".to_string(), json!({ "v": "old" })),
            ("2".to_string(), json!({ "v": 2 })),
        ];
        let merged = staging.merge("c", stored);
        assert_eq!(merged, vec![json!({ "v": "new" }), json!({ "v": 3 })]);
    }

    #[test]
    fn test_delete_hides_stored_objects() {
        let mut staging = Staging::default();
        staging.record(Action::DeleteCollection { id: "c".into() });
        staging.record(Action::CreateCollection {
            id: "c".into(),
            force: false,
        });

        assert_eq!(staging.collection("c"), Some(true));
        assert_eq!(staging.object("c", "1"), Some(None));
        assert!(staging
            .merge("c", vec![("1".to_string(), json!({}))])
            .is_empty());
        assert_eq!(staging.take().len(), 2);
        assert_eq!(staging.len(), 0);
    }
}
