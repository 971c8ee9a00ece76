//! Events announced by a [`Tree`](super::Tree) and the undo history.

use macrokit_core::{Event, EventManager};

use super::data::TreeData;
use super::id::ItemId;
use super::item::ItemDto;

/// A change to a tree.
///
/// For a single mutation the fine-grained event (`ItemAdded` and friends) is
/// always delivered before the `TreeCrud` snapshot that follows it.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    ItemAdded {
        item_id: ItemId,
        parent_id: ItemId,
        index: usize,
    },
    /// The item and every id in `removed_ids` (its subtree, item included) are gone.
    ItemRemoved {
        item_id: ItemId,
        parent_id: ItemId,
        index: usize,
        removed_ids: Vec<ItemId>,
    },
    ItemMoved {
        item_id: ItemId,
        old_parent_id: ItemId,
        new_parent_id: ItemId,
        old_index: usize,
        new_index: usize,
    },
    ItemModified {
        item_id: ItemId,
        changes: ItemDto,
    },
    TreeReset,
    /// Snapshot taken after a completed mutation.
    TreeCrud { tree_data: TreeData },
    /// Snapshot restored by an undo.
    TreeUndo { tree_data: TreeData },
    /// Snapshot restored by a redo.
    TreeRedo { tree_data: TreeData },
}

/// The kinds subscribers register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeEventKind {
    ItemAdded,
    ItemRemoved,
    ItemMoved,
    ItemModified,
    TreeReset,
    TreeCrud,
    TreeUndo,
    TreeRedo,
}

impl TreeEventKind {
    /// The fine-grained kinds, in declaration order.
    pub const ITEM_KINDS: [TreeEventKind; 5] = [
        TreeEventKind::ItemAdded,
        TreeEventKind::ItemRemoved,
        TreeEventKind::ItemMoved,
        TreeEventKind::ItemModified,
        TreeEventKind::TreeReset,
    ];
}

impl Event for TreeEvent {
    type Kind = TreeEventKind;

    fn kind(&self) -> TreeEventKind {
        match self {
            TreeEvent::ItemAdded { .. } => TreeEventKind::ItemAdded,
            TreeEvent::ItemRemoved { .. } => TreeEventKind::ItemRemoved,
            TreeEvent::ItemMoved { .. } => TreeEventKind::ItemMoved,
            TreeEvent::ItemModified { .. } => TreeEventKind::ItemModified,
            TreeEvent::TreeReset => TreeEventKind::TreeReset,
            TreeEvent::TreeCrud { .. } => TreeEventKind::TreeCrud,
            TreeEvent::TreeUndo { .. } => TreeEventKind::TreeUndo,
            TreeEvent::TreeRedo { .. } => TreeEventKind::TreeRedo,
        }
    }
}

impl TreeEvent {
    /// The snapshot carried by `TreeCrud`, `TreeUndo` and `TreeRedo`.
    pub fn tree_data(&self) -> Option<&TreeData> {
        match self {
            TreeEvent::TreeCrud { tree_data }
            | TreeEvent::TreeUndo { tree_data }
            | TreeEvent::TreeRedo { tree_data } => Some(tree_data),
            _ => None,
        }
    }
}

/// The broker trees and the undo history publish through.
pub type TreeEventManager = EventManager<TreeEvent>;
