//! In-memory backend.

use std::collections::BTreeMap;

use macrokit_core::logging::targets;
use parking_lot::RwLock;

use super::{
    Store, StoreError, StoreResult, decode_tree, prepare_save, read_tree_name, validate_tree_id,
};
use crate::model::Tree;

/// Keeps serialized trees in a map for the lifetime of the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn save(&self, tree: &Tree, tree_id: Option<&str>) -> StoreResult<String> {
        let (tree_id, data) = prepare_save(tree, tree_id)?;
        let json = data
            .to_json()
            .map_err(|err| StoreError::parse(&tree_id, err))?;
        self.documents.write().insert(tree_id.clone(), json);
        tracing::debug!(target: targets::STORE, tree_id = %tree_id, "tree saved in memory");
        Ok(tree_id)
    }

    fn load(&self, tree_id: &str) -> StoreResult<Option<Tree>> {
        validate_tree_id(tree_id)?;
        let json = self.documents.read().get(tree_id).cloned();
        json.map(|json| decode_tree(tree_id, &json)).transpose()
    }

    fn delete(&self, tree_id: &str) -> StoreResult<bool> {
        validate_tree_id(tree_id)?;
        Ok(self.documents.write().remove(tree_id).is_some())
    }

    fn list_trees(&self) -> StoreResult<BTreeMap<String, String>> {
        let documents = self.documents.read();
        let mut trees = BTreeMap::new();
        for (tree_id, json) in documents.iter() {
            match read_tree_name(json) {
                Ok(name) => {
                    trees.insert(tree_id.clone(), name);
                }
                Err(error) => {
                    tracing::warn!(
                        target: targets::STORE,
                        tree_id = %tree_id,
                        %error,
                        "skipping unreadable tree document"
                    );
                }
            }
        }
        Ok(trees)
    }
}
