//! Persistence of trees by id.
//!
//! [`Store`] is the only thing the rest of the crate knows about storage.
//! Two backends ship with it:
//! - [`JsonFileStore`]: one pretty-printed JSON document per tree in a directory
//! - [`MemoryStore`]: JSON documents in a map, for tests and scratch sessions
//!
//! Both store the tree's own serialized form, so anything written by one can
//! be read by [`Tree::from_json`].

mod atomic;
mod error;
mod json_file;
mod memory;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::{Tree, TreeData};

pub(crate) use atomic::write_atomic;
pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// A backend that saves, loads, deletes and lists trees.
pub trait Store: Send + Sync {
    /// Saves the tree under `tree_id`, or under the tree's own id for `None`,
    /// and returns the id used.
    ///
    /// The stored snapshot carries the id it was saved under.
    fn save(&self, tree: &Tree, tree_id: Option<&str>) -> StoreResult<String>;

    /// Loads a tree; `Ok(None)` if no tree has this id.
    fn load(&self, tree_id: &str) -> StoreResult<Option<Tree>>;

    /// Deletes a tree; `Ok(false)` if no tree had this id.
    fn delete(&self, tree_id: &str) -> StoreResult<bool>;

    /// Ids of all stored trees mapped to their names.
    ///
    /// Documents that cannot be read are left out and logged at `warn`.
    fn list_trees(&self) -> StoreResult<BTreeMap<String, String>>;
}

/// Rejects ids that are empty or could escape a directory.
pub(crate) fn validate_tree_id(tree_id: &str) -> StoreResult<()> {
    let invalid = tree_id.is_empty()
        || tree_id == "."
        || tree_id == ".."
        || tree_id.starts_with('.')
        || tree_id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::invalid_id(tree_id));
    }
    Ok(())
}

/// The id to save under and the snapshot to write.
///
/// Falls back to the tree's id, then to a fresh UUID when that is empty too.
pub(crate) fn prepare_save(tree: &Tree, tree_id: Option<&str>) -> StoreResult<(String, TreeData)> {
    let mut data = tree.to_dict();
    let tree_id = match tree_id {
        Some(id) => id.to_string(),
        None if data.id.is_empty() => uuid::Uuid::new_v4().to_string(),
        None => data.id.clone(),
    };
    validate_tree_id(&tree_id)?;
    data.id = tree_id.clone();
    Ok((tree_id, data))
}

/// Just enough of a stored document to list it.
#[derive(Deserialize)]
struct TreeHeader {
    #[serde(default)]
    name: String,
}

/// Reads the tree name from a stored document without decoding the items.
pub(crate) fn read_tree_name(json: &str) -> serde_json::Result<String> {
    serde_json::from_str::<TreeHeader>(json).map(|header| header.name)
}

/// Decodes a stored document into a tree.
pub(crate) fn decode_tree(tree_id: &str, json: &str) -> StoreResult<Tree> {
    Tree::from_json(json).map_err(|err| StoreError::parse(tree_id, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tree_id() {
        assert!(validate_tree_id("login-flow").is_ok());
        assert!(validate_tree_id("3f1c2a").is_ok());
        for bad in ["", ".", "..", ".hidden", "a/b", "a\\b"] {
            let err = validate_tree_id(bad).unwrap_err();
            assert_eq!(err.kind(), StoreErrorKind::InvalidId, "{bad:?}");
        }
    }

    #[test]
    fn test_prepare_save_ids() {
        let tree = Tree::new("t1", "T");
        assert_eq!(prepare_save(&tree, None).unwrap().0, "t1");

        let (id, data) = prepare_save(&tree, Some("copy")).unwrap();
        assert_eq!(id, "copy");
        assert_eq!(data.id, "copy");

        let unnamed = Tree::new("", "T");
        let (id, data) = prepare_save(&unnamed, None).unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(data.id, id);
    }
}
