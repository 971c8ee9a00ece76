//! A hierarchical macro model.
//!
//! A macro is a tree of groups and instructions hanging off a permanent
//! dummy root. This crate provides:
//!
//! - **Model**: [`Item`], [`ItemDto`] and the [`Tree`] that owns them,
//!   announcing every change as a [`TreeEvent`]
//! - **History**: snapshot-based undo and redo through [`StateManager`]
//! - **Persistence**: the [`Store`] trait with JSON directory and in-memory
//!   backends
//! - **View-model**: [`ViewModel`], which mediates between a UI and the tree
//!   and republishes changes as signals
//! - **Settings**: TOML configuration for all of the above
//!
//! # Example
//!
//! ```
//! use macrokit::{ItemDto, Position, Tree, TreeEventKind, TreeEventManager};
//!
//! let events = TreeEventManager::new();
//! events.subscribe(TreeEventKind::ItemAdded, |event| println!("{event:?}"));
//!
//! let tree = Tree::new("t1", "Login").with_event_manager(events);
//! let group = tree.add_item(ItemDto::group("Open app"), None, Position::Append).unwrap();
//! tree.add_item(ItemDto::instruction("Click icon"), Some(&group), Position::At(0)).unwrap();
//!
//! assert_eq!(tree.len(), 2);
//! assert_eq!(tree.execution_order(None).unwrap().len(), 1);
//! ```

pub mod error;
pub mod history;
pub mod model;
pub mod settings;
pub mod store;
pub mod view_model;

pub use error::{TreeError, TreeResult};
pub use history::{DEFAULT_MAX_HISTORY, StateManager};
pub use model::{
    Item, ItemDomainData, ItemDto, ItemId, ItemUIStateData, NodeType, Position, Tree, TreeData,
    TreeEvent, TreeEventKind, TreeEventManager,
};
pub use settings::{Settings, SettingsError, SettingsResult};
pub use store::{JsonFileStore, MemoryStore, Store, StoreError, StoreErrorKind, StoreResult};
pub use view_model::{TreeViewAdapter, ViewModel, ViewModelError, ViewModelResult, ViewModelSignals};

pub use macrokit_core::{ConnectionGuard, ConnectionId, Signal};
