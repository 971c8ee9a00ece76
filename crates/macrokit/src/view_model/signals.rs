//! UI-facing signals of the view-model.

use macrokit_core::Signal;

use crate::model::{ItemDto, ItemId, TreeData};

/// Everything a view can listen to.
///
/// The item signals mirror the tree's fine-grained events so a view can
/// patch itself incrementally; `tree_rebuilt` asks it to redraw from scratch.
pub struct ViewModelSignals {
    /// Args: (item, parent, index)
    pub item_added: Signal<(ItemId, ItemId, usize)>,
    /// Args: (item, former parent, removed ids including the item)
    pub item_removed: Signal<(ItemId, ItemId, Vec<ItemId>)>,
    /// Args: (item, old parent, new parent, new index)
    pub item_moved: Signal<(ItemId, ItemId, ItemId, usize)>,
    /// Args: (item, data the item now holds)
    pub item_modified: Signal<(ItemId, ItemDto)>,
    pub tree_reset: Signal<()>,
    /// Snapshot after every change to the tree.
    pub tree_changed: Signal<TreeData>,
    /// Snapshot restored by undo, redo or load.
    pub tree_rebuilt: Signal<TreeData>,
    /// Args: (selected, deselected)
    pub selection_changed: Signal<(Vec<ItemId>, Vec<ItemId>)>,
    /// Args: (can undo, can redo)
    pub history_changed: Signal<(bool, bool)>,
    pub error_occurred: Signal<String>,
}

impl ViewModelSignals {
    pub fn new() -> Self {
        Self {
            item_added: Signal::new(),
            item_removed: Signal::new(),
            item_moved: Signal::new(),
            item_modified: Signal::new(),
            tree_reset: Signal::new(),
            tree_changed: Signal::new(),
            tree_rebuilt: Signal::new(),
            selection_changed: Signal::new(),
            history_changed: Signal::new(),
            error_occurred: Signal::new(),
        }
    }

    /// Suppresses (or resumes) every signal at once.
    pub fn set_blocked(&self, blocked: bool) {
        self.item_added.set_blocked(blocked);
        self.item_removed.set_blocked(blocked);
        self.item_moved.set_blocked(blocked);
        self.item_modified.set_blocked(blocked);
        self.tree_reset.set_blocked(blocked);
        self.tree_changed.set_blocked(blocked);
        self.tree_rebuilt.set_blocked(blocked);
        self.selection_changed.set_blocked(blocked);
        self.history_changed.set_blocked(blocked);
        self.error_occurred.set_blocked(blocked);
    }
}

impl Default for ViewModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(ViewModelSignals: Send, Sync);
