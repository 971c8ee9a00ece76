//! The mediator between a UI and the macro tree.
//!
//! [`ViewModel`] owns the tree, its event broker, the undo history and an
//! optional store. It turns user intents ("add an item next to what I have
//! selected") into tree operations and republishes everything the tree
//! announces on [`ViewModelSignals`], which a view connects to directly or
//! through a [`TreeViewAdapter`].
//!
//! # Example
//!
//! ```
//! use macrokit::model::{NodeType, Tree};
//! use macrokit::view_model::ViewModel;
//!
//! let vm = ViewModel::new(Tree::new("t1", "Login"));
//! let group = vm.add_item("Open app", Some(NodeType::Group), None).unwrap();
//! let first = vm.add_item("Click icon", Some(NodeType::Instruction), Some(&group)).unwrap();
//! let second = vm.add_item("Wait", Some(NodeType::Instruction), Some(&first)).unwrap();
//!
//! let names: Vec<_> = vm.get_children(Some(&group)).iter().map(|i| i.name().to_string()).collect();
//! assert_eq!(names, ["Click icon", "Wait"]);
//!
//! assert!(vm.undo());
//! assert!(vm.get_item(&second).is_none());
//! ```

mod adapter;
mod selection;
mod signals;

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use macrokit_core::ConnectionId;
use macrokit_core::logging::targets;
use parking_lot::Mutex;

use crate::error::TreeError;
use crate::history::StateManager;
use crate::model::{
    Item, ItemDto, ItemId, NodeType, Position, Tree, TreeData, TreeDebug, TreeEvent,
    TreeEventKind, TreeEventManager, TreeFormatOptions,
};
use crate::settings::Settings;
use crate::store::{Store, StoreError};

pub use adapter::{AdapterConnection, TreeViewAdapter};
pub use selection::Selection;
pub use signals::ViewModelSignals;

/// Result type alias for view-model operations.
pub type ViewModelResult<T> = std::result::Result<T, ViewModelError>;

/// Errors surfaced by the view-model.
#[derive(Debug, thiserror::Error)]
pub enum ViewModelError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A persistence operation was requested but no store is attached.
    #[error("no store is attached to the view-model")]
    NoStore,
}

fn announce_selection(signals: &ViewModelSignals, selected: Vec<ItemId>, deselected: Vec<ItemId>) {
    if selected.is_empty() && deselected.is_empty() {
        return;
    }
    tracing::trace!(
        target: targets::VIEW_MODEL,
        selected = selected.len(),
        deselected = deselected.len(),
        "selection changed"
    );
    signals.selection_changed.emit((selected, deselected));
}

fn announce_history(signals: &ViewModelSignals, history: &StateManager) {
    signals
        .history_changed
        .emit((history.can_undo(), history.can_redo()));
}

/// Mediates between a view and a [`Tree`].
///
/// Every failing operation returns its error and also reports it on
/// [`ViewModelSignals::error_occurred`].
pub struct ViewModel {
    tree: Arc<Tree>,
    events: TreeEventManager,
    history: Arc<StateManager>,
    store: Option<Box<dyn Store>>,
    signals: Arc<ViewModelSignals>,
    selection: Arc<Mutex<Selection>>,
    tree_subscriptions: Vec<(TreeEventKind, ConnectionId)>,
    history_subscriptions: Vec<(TreeEventKind, ConnectionId)>,
}

static_assertions::assert_impl_all!(ViewModel: Send, Sync);

impl ViewModel {
    /// Wraps `tree` with a default-sized undo history.
    pub fn new(tree: Tree) -> Self {
        Self::with_state_manager(tree, StateManager::default())
    }

    /// Wraps `tree` with the given history.
    ///
    /// The tree keeps its event manager if it has one; otherwise it gets a
    /// fresh one. The history starts from the tree's current state.
    pub fn with_state_manager(mut tree: Tree, history: StateManager) -> Self {
        let events = tree.event_manager().cloned().unwrap_or_default();
        tree.set_event_manager(Some(events.clone()));
        let tree = Arc::new(tree);
        let history = Arc::new(history);
        history.set_initial_state(&tree);

        let mut view_model = Self {
            tree,
            events,
            history,
            store: None,
            signals: Arc::new(ViewModelSignals::new()),
            selection: Arc::new(Mutex::new(Selection::new())),
            tree_subscriptions: Vec::new(),
            history_subscriptions: Vec::new(),
        };
        view_model.subscribe_tree();
        view_model.subscribe_history();
        view_model
    }

    /// Builds an empty tree, history and JSON store from settings.
    pub fn from_settings(settings: &Settings) -> ViewModelResult<Self> {
        let tree = Tree::new(uuid::Uuid::new_v4().to_string(), settings.tree.default_name.clone());
        let store = settings.open_store()?;
        Ok(Self::with_state_manager(tree, settings.state_manager()).with_store(store))
    }

    /// Attaches a persistence backend.
    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn set_store(&mut self, store: Option<Box<dyn Store>>) {
        self.store = store;
    }

    fn subscribe_tree(&mut self) {
        let signals = self.signals.clone();
        let id = self.events.subscribe(TreeEventKind::ItemAdded, move |event| {
            if let TreeEvent::ItemAdded { item_id, parent_id, index } = event {
                signals
                    .item_added
                    .emit((item_id.clone(), parent_id.clone(), *index));
            }
        });
        self.tree_subscriptions.push((TreeEventKind::ItemAdded, id));

        let signals = self.signals.clone();
        let selection = self.selection.clone();
        let id = self.events.subscribe(TreeEventKind::ItemRemoved, move |event| {
            if let TreeEvent::ItemRemoved { item_id, parent_id, removed_ids, .. } = event {
                let deselected = selection.lock().retain(|id| !removed_ids.contains(id));
                announce_selection(&signals, Vec::new(), deselected);
                signals
                    .item_removed
                    .emit((item_id.clone(), parent_id.clone(), removed_ids.clone()));
            }
        });
        self.tree_subscriptions.push((TreeEventKind::ItemRemoved, id));

        let signals = self.signals.clone();
        let id = self.events.subscribe(TreeEventKind::ItemMoved, move |event| {
            if let TreeEvent::ItemMoved { item_id, old_parent_id, new_parent_id, new_index, .. } = event {
                signals.item_moved.emit((
                    item_id.clone(),
                    old_parent_id.clone(),
                    new_parent_id.clone(),
                    *new_index,
                ));
            }
        });
        self.tree_subscriptions.push((TreeEventKind::ItemMoved, id));

        let signals = self.signals.clone();
        let id = self.events.subscribe(TreeEventKind::ItemModified, move |event| {
            if let TreeEvent::ItemModified { item_id, changes } = event {
                signals.item_modified.emit((item_id.clone(), changes.clone()));
            }
        });
        self.tree_subscriptions.push((TreeEventKind::ItemModified, id));

        let signals = self.signals.clone();
        let selection = self.selection.clone();
        let id = self.events.subscribe(TreeEventKind::TreeReset, move |_| {
            let deselected = selection.lock().clear();
            announce_selection(&signals, Vec::new(), deselected);
            signals.tree_reset.emit(());
        });
        self.tree_subscriptions.push((TreeEventKind::TreeReset, id));

        let signals = self.signals.clone();
        let history = self.history.clone();
        let id = self.events.subscribe(TreeEventKind::TreeCrud, move |event| {
            if let TreeEvent::TreeCrud { tree_data } = event {
                history.new_undo(tree_data.clone());
                signals.tree_changed.emit_ref(tree_data);
                announce_history(&signals, &history);
            }
        });
        self.tree_subscriptions.push((TreeEventKind::TreeCrud, id));
    }

    fn subscribe_history(&mut self) {
        for kind in [TreeEventKind::TreeUndo, TreeEventKind::TreeRedo] {
            let tree: Weak<Tree> = Arc::downgrade(&self.tree);
            let signals = self.signals.clone();
            let selection = self.selection.clone();
            let id = self.history.subscribe(kind, move |event| {
                let (Some(tree), Some(tree_data)) = (tree.upgrade(), event.tree_data()) else {
                    return;
                };
                if let Err(err) = tree.dict_to_state(tree_data.clone()) {
                    tracing::error!(target: targets::VIEW_MODEL, error = %err, "failed to restore snapshot");
                    signals.error_occurred.emit(err.to_string());
                    return;
                }
                let deselected = selection.lock().retain(|id| tree.contains(id));
                announce_selection(&signals, Vec::new(), deselected);
                signals.tree_rebuilt.emit_ref(tree_data);
            });
            self.history_subscriptions.push((kind, id));
        }
    }

    /// Converts and reports a failure.
    fn report<T, E>(&self, operation: &'static str, result: Result<T, E>) -> ViewModelResult<T>
    where
        E: Into<ViewModelError>,
    {
        result.map_err(|err| {
            let err = err.into();
            tracing::warn!(target: targets::VIEW_MODEL, operation, error = %err, "operation failed");
            self.signals.error_occurred.emit(err.to_string());
            err
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn history(&self) -> &StateManager {
        &self.history
    }

    pub fn signals(&self) -> &ViewModelSignals {
        &self.signals
    }

    pub fn event_manager(&self) -> &TreeEventManager {
        &self.events
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Wires every signal to `adapter` until the returned connection is dropped.
    pub fn attach_adapter(&self, adapter: Arc<dyn TreeViewAdapter>) -> AdapterConnection {
        AdapterConnection::attach(&self.signals, adapter)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_item(&self, id: &ItemId) -> Option<Item> {
        self.tree.get_item(id)
    }

    pub fn get_children(&self, parent_id: Option<&ItemId>) -> Vec<Item> {
        self.tree.get_children(parent_id)
    }

    pub fn tree_snapshot(&self) -> TreeData {
        self.tree.to_dict()
    }

    /// Instructions below `start_id` in replay order.
    pub fn execution_order(&self, start_id: Option<&ItemId>) -> ViewModelResult<Vec<Item>> {
        self.report("execution_order", self.tree.execution_order(start_id))
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Where a new item goes given the current selection.
    ///
    /// - nothing selected: appended at the top level
    /// - a group: appended inside it
    /// - an instruction: right after it, under the same parent
    /// - anything else: appended inside it
    fn placement_for(&self, selected_id: Option<&ItemId>) -> (Option<ItemId>, Position) {
        let Some(selected_id) = selected_id else {
            return (None, Position::Append);
        };
        let selected = self.tree.get_item(selected_id);
        match selected.as_ref().and_then(Item::node_type) {
            Some(NodeType::Instruction) => {
                let parent = selected.as_ref().and_then(|item| item.parent_id().cloned());
                let position = self
                    .tree
                    .index_of(selected_id)
                    .map_or(Position::Append, |index| Position::At(index + 1));
                (parent, position)
            }
            Some(NodeType::Group) | None => (Some(selected_id.clone()), Position::Append),
        }
    }

    /// Adds a new item named `name`, placed relative to `selected_id`.
    pub fn add_item(
        &self,
        name: &str,
        new_type: Option<NodeType>,
        selected_id: Option<&ItemId>,
    ) -> ViewModelResult<ItemId> {
        self.add_item_dto(ItemDto::new(name, new_type), selected_id)
    }

    /// Like [`add_item`](Self::add_item) with full item data.
    pub fn add_item_dto(&self, dto: ItemDto, selected_id: Option<&ItemId>) -> ViewModelResult<ItemId> {
        let (parent_id, position) = self.placement_for(selected_id);
        tracing::debug!(
            target: targets::VIEW_MODEL,
            name = %dto.domain.name,
            parent = ?parent_id,
            ?position,
            "adding item"
        );
        self.report("add_item", self.tree.add_item(dto, parent_id.as_ref(), position))
    }

    pub fn remove_item(&self, id: &ItemId) -> ViewModelResult<()> {
        self.report("remove_item", self.tree.remove_item(id))
    }

    /// Removes every selected item; returns how many subtrees were removed.
    ///
    /// Items whose ancestor is also selected go away with the ancestor.
    pub fn remove_selected(&self) -> ViewModelResult<usize> {
        let selected = self.selection.lock().ids().to_vec();
        let roots: Vec<ItemId> = selected
            .iter()
            .filter(|id| {
                !self
                    .tree
                    .ancestors(id)
                    .iter()
                    .any(|ancestor| selected.contains(ancestor))
            })
            .cloned()
            .collect();

        let mut removed = 0;
        for id in &roots {
            if self.tree.contains(id) {
                self.remove_item(id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn move_item(
        &self,
        id: &ItemId,
        new_parent_id: Option<&ItemId>,
        new_index: impl Into<Position>,
    ) -> ViewModelResult<bool> {
        self.report("move_item", self.tree.move_item(id, new_parent_id, new_index))
    }

    pub fn modify_item(&self, id: &ItemId, dto: ItemDto) -> ViewModelResult<()> {
        self.report("modify_item", self.tree.modify_item(id, dto))
    }

    fn current_dto(&self, id: &ItemId) -> ViewModelResult<ItemDto> {
        let item = self.tree.get_item(id).ok_or_else(|| TreeError::ItemNotFound(id.clone()));
        self.report("get_item", item).map(|item| item.to_dto())
    }

    pub fn rename_item(&self, id: &ItemId, name: impl Into<String>) -> ViewModelResult<()> {
        let mut dto = self.current_dto(id)?;
        dto.domain.name = name.into();
        self.modify_item(id, dto)
    }

    /// Expands or collapses an item; does nothing if it is already so.
    pub fn set_expanded(&self, id: &ItemId, expanded: bool) -> ViewModelResult<()> {
        let mut dto = self.current_dto(id)?;
        if dto.ui.is_expanded == expanded {
            return Ok(());
        }
        dto.ui.is_expanded = expanded;
        self.modify_item(id, dto)
    }

    /// Flips the expansion state and returns the new one.
    pub fn toggle_expanded(&self, id: &ItemId) -> ViewModelResult<bool> {
        let expanded = !self.current_dto(id)?.ui.is_expanded;
        self.set_expanded(id, expanded)?;
        Ok(expanded)
    }

    pub fn reset_tree(&self) -> ViewModelResult<()> {
        self.report("reset_tree", self.tree.reset_tree())
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Adds an existing item to the selection.
    pub fn select(&self, id: &ItemId) -> bool {
        if !self.tree.contains(id) || id.is_dummy_root() {
            return false;
        }
        let added = self.selection.lock().insert(id.clone());
        if added {
            announce_selection(&self.signals, vec![id.clone()], Vec::new());
        }
        added
    }

    pub fn deselect(&self, id: &ItemId) -> bool {
        let removed = self.selection.lock().remove(id);
        if removed {
            announce_selection(&self.signals, Vec::new(), vec![id.clone()]);
        }
        removed
    }

    /// Replaces the selection; unknown ids are ignored.
    pub fn set_selection(&self, ids: impl IntoIterator<Item = ItemId>) {
        let ids: Vec<ItemId> = ids
            .into_iter()
            .filter(|id| self.tree.contains(id) && !id.is_dummy_root())
            .collect();
        let (selected, deselected) = self.selection.lock().replace(ids);
        announce_selection(&self.signals, selected, deselected);
    }

    pub fn clear_selection(&self) {
        let deselected = self.selection.lock().clear();
        announce_selection(&self.signals, Vec::new(), deselected);
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selection.lock().contains(id)
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.selection.lock().ids().to_vec()
    }

    pub fn get_selected_items(&self) -> Vec<Item> {
        self.selected_ids()
            .iter()
            .filter_map(|id| self.tree.get_item(id))
            .collect()
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Restores the previous snapshot; `false` if there is none.
    ///
    /// Called from inside a tree callback it reports
    /// [`TreeError::ReentrantMutation`], leaves the history untouched and
    /// returns `false`.
    pub fn undo(&self) -> bool {
        let outcome = self
            .tree
            .exclusive(|| self.history.undo(self.tree.to_dict()).is_some());
        match self.report("undo", outcome) {
            Ok(true) => {
                announce_history(&self.signals, &self.history);
                true
            }
            _ => false,
        }
    }

    /// Re-applies an undone snapshot; `false` if there is none.
    pub fn redo(&self) -> bool {
        let outcome = self
            .tree
            .exclusive(|| self.history.redo(self.tree.to_dict()).is_some());
        match self.report("redo", outcome) {
            Ok(true) => {
                announce_history(&self.signals, &self.history);
                true
            }
            _ => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn store(&self) -> ViewModelResult<&dyn Store> {
        let store = self.store.as_deref().ok_or(ViewModelError::NoStore);
        self.report("store", store)
    }

    /// Saves the tree under `tree_id` (or its own id) and returns the id used.
    pub fn save(&self, tree_id: Option<&str>) -> ViewModelResult<String> {
        let store = self.store()?;
        self.report("save", store.save(&self.tree, tree_id))
    }

    /// Replaces the tree with a stored one; `Ok(false)` if it does not exist.
    ///
    /// Loading starts a fresh history and clears the selection.
    pub fn load(&self, tree_id: &str) -> ViewModelResult<bool> {
        let store = self.store()?;
        let Some(loaded) = self.report("load", store.load(tree_id))? else {
            return Ok(false);
        };

        let snapshot = loaded.to_dict();
        self.report("load", self.tree.dict_to_state(snapshot.clone()))?;
        self.history.set_initial_state(&self.tree);
        self.clear_selection();

        tracing::debug!(target: targets::VIEW_MODEL, tree_id, items = self.tree.len(), "tree loaded");
        tracing::trace!(
            target: targets::VIEW_MODEL,
            "\n{}",
            TreeDebug::with_options(TreeFormatOptions::minimal()).format(&snapshot)
        );
        self.signals.tree_rebuilt.emit(snapshot);
        announce_history(&self.signals, &self.history);
        Ok(true)
    }

    pub fn delete(&self, tree_id: &str) -> ViewModelResult<bool> {
        let store = self.store()?;
        self.report("delete", store.delete(tree_id))
    }

    pub fn list_trees(&self) -> ViewModelResult<BTreeMap<String, String>> {
        let store = self.store()?;
        self.report("list_trees", store.list_trees())
    }
}

impl Drop for ViewModel {
    fn drop(&mut self) {
        for (kind, id) in self.tree_subscriptions.drain(..) {
            self.events.unsubscribe(kind, id);
        }
        for (kind, id) in self.history_subscriptions.drain(..) {
            self.history.event_manager().unsubscribe(kind, id);
        }
    }
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModel")
            .field("tree", &self.tree)
            .field("history", &self.history)
            .field("selected", &self.selection.lock().len())
            .field("has_store", &self.store.is_some())
            .finish()
    }
}
