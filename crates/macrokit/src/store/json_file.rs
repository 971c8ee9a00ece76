//! Directory-of-JSON-files backend.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use macrokit_core::PerfSpan;
use macrokit_core::logging::{span_names, targets};

use super::{
    Store, StoreError, StoreResult, decode_tree, prepare_save, read_tree_name, validate_tree_id,
    write_atomic,
};
use crate::model::Tree;

const EXTENSION: &str = "json";

/// Stores each tree as `<tree_id>.json` in one directory.
///
/// Writes go through a temporary file and a rename, so a crash never leaves
/// a half-written tree behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    directory: PathBuf,
    pretty: bool,
}

impl JsonFileStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(directory: impl Into<PathBuf>) -> StoreResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|err| StoreError::connect(&directory, err))?;
        if !directory.is_dir() {
            return Err(StoreError::connect(
                &directory,
                io::Error::new(io::ErrorKind::NotADirectory, "store path is not a directory"),
            ));
        }
        tracing::debug!(target: targets::STORE, directory = %directory.display(), "json store opened");
        Ok(Self {
            directory,
            pretty: true,
        })
    }

    /// Writes compact JSON instead of pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file a tree with this id is stored in.
    pub fn path_for(&self, tree_id: &str) -> StoreResult<PathBuf> {
        validate_tree_id(tree_id)?;
        Ok(self.directory.join(format!("{tree_id}.{EXTENSION}")))
    }
}

impl Store for JsonFileStore {
    fn save(&self, tree: &Tree, tree_id: Option<&str>) -> StoreResult<String> {
        let _span = PerfSpan::new(span_names::STORE);
        let (tree_id, data) = prepare_save(tree, tree_id)?;
        let path = self.path_for(&tree_id)?;

        let json = if self.pretty {
            serde_json::to_string_pretty(&data)
        } else {
            serde_json::to_string(&data)
        }
        .map_err(|err| StoreError::parse(&tree_id, err))?;

        write_atomic(&path, json.as_bytes()).map_err(|err| StoreError::io(&path, err))?;
        tracing::debug!(
            target: targets::STORE,
            tree_id = %tree_id,
            path = %path.display(),
            items = data.item_count(),
            "tree saved"
        );
        Ok(tree_id)
    }

    fn load(&self, tree_id: &str) -> StoreResult<Option<Tree>> {
        let _span = PerfSpan::new(span_names::STORE);
        let path = self.path_for(tree_id)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(target: targets::STORE, tree_id, "tree not in store");
                return Ok(None);
            }
            Err(err) => return Err(StoreError::io(&path, err)),
        };

        let tree = decode_tree(tree_id, &json).map_err(|err| err.with_path(&path))?;
        tracing::debug!(target: targets::STORE, tree_id, items = tree.len(), "tree loaded");
        Ok(Some(tree))
    }

    fn delete(&self, tree_id: &str) -> StoreResult<bool> {
        let path = self.path_for(tree_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(target: targets::STORE, tree_id, "tree deleted");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::io(&path, err)),
        }
    }

    fn list_trees(&self) -> StoreResult<BTreeMap<String, String>> {
        let entries =
            fs::read_dir(&self.directory).map_err(|err| StoreError::io(&self.directory, err))?;

        let mut trees = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(&self.directory, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(tree_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_tree_id(tree_id).is_err() {
                continue;
            }

            let header = fs::read_to_string(&path)
                .map_err(|err| err.to_string())
                .and_then(|json| read_tree_name(&json).map_err(|err| err.to_string()));
            match header {
                Ok(name) => {
                    trees.insert(tree_id.to_string(), name);
                }
                Err(error) => {
                    tracing::warn!(
                        target: targets::STORE,
                        path = %path.display(),
                        %error,
                        "skipping unreadable tree file"
                    );
                }
            }
        }
        Ok(trees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemDto;
    use crate::store::StoreErrorKind;

    fn sample(id: &str, name: &str) -> Tree {
        let tree = Tree::new(id, name);
        let g = tree.add_item(ItemDto::group("G"), None, -1).unwrap();
        tree.add_item(ItemDto::instruction("I"), Some(&g), -1).unwrap();
        tree
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = JsonFileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.directory(), nested);
    }

    #[test]
    fn test_open_on_file_fails_connect() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "x").unwrap();
        let err = JsonFileStore::open(&file).unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Connect);
    }

    #[test]
    fn test_save_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample("t1", "T"), None).unwrap();

        let text = fs::read_to_string(dir.path().join("t1.json")).unwrap();
        assert!(text.starts_with("{\n  \"id\": \"t1\""));
    }

    #[test]
    fn test_compact_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap().with_pretty(false);
        store.save(&sample("t1", "T"), None).unwrap();

        let text = fs::read_to_string(dir.path().join("t1.json")).unwrap();
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_load_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("bad.json"), "{ nope").unwrap();

        let err = store.load("bad").unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Parse);
        assert!(err.path().is_some());
    }

    #[test]
    fn test_list_skips_unreadable_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample("t1", "First"), None).unwrap();
        fs::write(dir.path().join("broken.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let trees = store.list_trees().unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees.get("t1").map(String::as_str), Some("First"));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let err = store.save(&sample("t1", "T"), Some("../escape")).unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::InvalidId);
        assert_eq!(store.load("a/b").unwrap_err().kind(), StoreErrorKind::InvalidId);
    }
}
