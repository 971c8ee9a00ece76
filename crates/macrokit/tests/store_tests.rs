//! Tests for persisting trees through the JSON directory store.

use std::fs;
use std::io;
use std::sync::Arc;

use macrokit::{
    ItemDto, JsonFileStore, NodeType, Position, Settings, Store, StoreErrorKind, Tree, ViewModel,
};
use parking_lot::Mutex;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn login_tree() -> Tree {
    let tree = Tree::new("login", "Login flow");
    let group = tree.add_item(ItemDto::group("Open app"), None, Position::Append).unwrap();
    tree.add_item(ItemDto::instruction("Click icon"), Some(&group), Position::Append)
        .unwrap();
    tree
}

#[test]
fn test_save_load_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("trees")).unwrap();

    let tree = login_tree();
    assert_eq!(store.save(&tree, None).unwrap(), "login");
    assert_eq!(store.save(&tree, Some("login-copy")).unwrap(), "login-copy");
    assert!(dir.path().join("trees/login.json").is_file());

    let loaded = store.load("login").unwrap().unwrap();
    assert_eq!(loaded, tree);
    let copy = store.load("login-copy").unwrap().unwrap();
    assert_eq!(copy.id(), "login-copy");
    assert_eq!(copy.len(), 2);

    let listed = store.list_trees().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed["login"], "Login flow");

    assert!(store.delete("login").unwrap());
    assert!(!store.delete("login").unwrap());
    assert!(store.load("login").unwrap().is_none());
}

#[test]
fn test_stored_document_is_pretty_json_of_the_tree() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let tree = login_tree();
    store.save(&tree, None).unwrap();

    let text = fs::read_to_string(dir.path().join("login.json")).unwrap();
    assert!(text.contains("\n  \"id\": \"login\""), "{text}");
    assert_eq!(Tree::from_json(&text).unwrap(), tree);
}

#[test]
fn test_corrupt_document_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let err = match store.load("broken") {
        Err(err) => err,
        Ok(tree) => panic!("expected a parse error, got {tree:?}"),
    };
    assert_eq!(err.kind(), StoreErrorKind::Parse);
    assert_eq!(err.tree_id(), Some("broken"));
    assert_eq!(err.path(), Some(dir.path().join("broken.json").as_path()));
}

#[test]
fn test_unreadable_files_are_skipped_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.save(&login_tree(), None).unwrap();
    fs::write(dir.path().join("broken.json"), "[1, 2").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a tree").unwrap();

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("macrokit::store=warn")
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let listed = tracing::subscriber::with_default(subscriber, || store.list_trees().unwrap());

    assert_eq!(listed.keys().collect::<Vec<_>>(), ["login"]);
    let logs = String::from_utf8_lossy(&logs.0.lock()).into_owned();
    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("skipping unreadable tree file"), "{logs}");
    assert!(logs.contains("broken.json"), "{logs}");
    assert!(!logs.contains("notes.txt"), "{logs}");
}

#[test]
fn test_ids_that_escape_the_directory_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let tree = login_tree();

    for bad in ["", "../outside", "nested/name", ".hidden"] {
        let err = store.save(&tree, Some(bad)).unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::InvalidId, "{bad:?}");
    }
    assert!(store.list_trees().unwrap().is_empty());
}

#[test]
fn test_open_on_a_file_fails_to_connect() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("occupied");
    fs::write(&file, "").unwrap();

    let err = JsonFileStore::open(&file).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Connect);
}

#[test]
fn test_view_model_from_settings_persists_to_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::from_toml_str(&format!(
        "[store]\ndirectory = {:?}\n\n[tree]\ndefault_name = \"Scratch\"\n",
        dir.path().join("macros").display().to_string()
    ))
    .unwrap();

    let vm = ViewModel::from_settings(&settings).unwrap();
    assert_eq!(vm.tree().name(), "Scratch");
    vm.add_item("Open app", Some(NodeType::Group), None).unwrap();
    let id = vm.save(None).unwrap();
    assert_eq!(id, vm.tree().id());

    let other = ViewModel::from_settings(&settings).unwrap();
    assert_eq!(other.list_trees().unwrap()[&id], "Scratch");
    assert!(other.load(&id).unwrap());
    assert_eq!(other.tree().len(), 1);
    assert!(!other.can_undo());
}
