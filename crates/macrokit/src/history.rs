//! Snapshot-based undo/redo history.
//!
//! [`StateManager`] keeps the current snapshot (the *stage*) plus two bounded
//! stacks of full tree snapshots:
//! - `new_undo` pushes the old stage onto the undo stack and clears redo
//! - `undo`/`redo` trade the caller's current snapshot for the top of the
//!   opposite stack
//! - both stacks drop their oldest entry once they exceed `max_history`
//!
//! Restores are announced as [`TreeEvent::TreeUndo`] and
//! [`TreeEvent::TreeRedo`] through the manager's own event broker, which is
//! separate from any tree's broker.
//!
//! # Usage
//!
//! ```
//! use macrokit::history::StateManager;
//! use macrokit::model::{ItemDto, Tree};
//!
//! let tree = Tree::new("t", "T");
//! let history = StateManager::new(10);
//! history.set_initial_state(&tree);
//!
//! tree.add_item(ItemDto::group("A"), None, -1).unwrap();
//! history.new_undo(tree.to_dict());
//!
//! let previous = history.undo(tree.to_dict()).unwrap();
//! tree.dict_to_state(previous).unwrap();
//! assert!(tree.is_empty());
//! ```

use std::collections::VecDeque;

use macrokit_core::ConnectionId;
use macrokit_core::logging::targets;
use parking_lot::Mutex;

use crate::model::{Tree, TreeData, TreeEvent, TreeEventKind, TreeEventManager};

/// Default number of snapshots kept on each stack.
pub const DEFAULT_MAX_HISTORY: usize = 100;

#[derive(Default)]
struct Stacks {
    stage: Option<TreeData>,
    /// Oldest first.
    undo: VecDeque<TreeData>,
    /// Oldest first.
    redo: VecDeque<TreeData>,
}

fn push_bounded(stack: &mut VecDeque<TreeData>, snapshot: TreeData, max: usize) {
    stack.push_back(snapshot);
    while stack.len() > max {
        stack.pop_front();
    }
}

/// Undo/redo engine over full tree snapshots.
///
/// Internally synchronized; the lock is released before subscribers run, so
/// they may query the manager from a callback.
pub struct StateManager {
    stacks: Mutex<Stacks>,
    max_history: usize,
    events: TreeEventManager,
}

static_assertions::assert_impl_all!(StateManager: Send, Sync);

impl Default for StateManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl StateManager {
    /// Creates an empty history keeping at most `max_history` snapshots per stack.
    pub fn new(max_history: usize) -> Self {
        Self {
            stacks: Mutex::new(Stacks::default()),
            max_history,
            events: TreeEventManager::new(),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// The broker `TreeCrud`, `TreeUndo` and `TreeRedo` are announced on.
    pub fn event_manager(&self) -> &TreeEventManager {
        &self.events
    }

    pub fn subscribe<F>(&self, kind: TreeEventKind, callback: F) -> ConnectionId
    where
        F: Fn(&TreeEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, callback)
    }

    /// Takes the tree's current snapshot as the stage and forgets all history.
    pub fn set_initial_state(&self, tree: &Tree) {
        let mut stacks = self.stacks.lock();
        stacks.stage = Some(tree.to_dict());
        stacks.undo.clear();
        stacks.redo.clear();
        tracing::debug!(target: targets::HISTORY, "history reset to initial state");
    }

    /// Records `snapshot` as the new stage, pushing the previous stage onto
    /// the undo stack and clearing the redo stack.
    pub fn new_undo(&self, snapshot: TreeData) -> TreeData {
        {
            let mut stacks = self.stacks.lock();
            if let Some(previous) = stacks.stage.replace(snapshot.clone()) {
                push_bounded(&mut stacks.undo, previous, self.max_history);
            }
            stacks.redo.clear();
            tracing::debug!(
                target: targets::HISTORY,
                undo_depth = stacks.undo.len(),
                "undo snapshot recorded"
            );
        }

        if self.events.subscriber_count(TreeEventKind::TreeCrud) > 0 {
            self.events.notify(TreeEvent::TreeCrud {
                tree_data: snapshot.clone(),
            });
        }
        snapshot
    }

    /// Steps back one snapshot.
    ///
    /// `current` is saved on the redo stack. Returns `None` and changes
    /// nothing when there is nothing to undo.
    pub fn undo(&self, current: TreeData) -> Option<TreeData> {
        let restored = {
            let mut stacks = self.stacks.lock();
            let restored = stacks.undo.pop_back()?;
            push_bounded(&mut stacks.redo, current, self.max_history);
            stacks.stage = Some(restored.clone());
            tracing::debug!(
                target: targets::HISTORY,
                undo_remaining = stacks.undo.len(),
                redo_depth = stacks.redo.len(),
                "undo"
            );
            restored
        };

        self.events.notify(TreeEvent::TreeUndo {
            tree_data: restored.clone(),
        });
        Some(restored)
    }

    /// Steps forward one snapshot; the mirror image of [`undo`](Self::undo).
    pub fn redo(&self, current: TreeData) -> Option<TreeData> {
        let restored = {
            let mut stacks = self.stacks.lock();
            let restored = stacks.redo.pop_back()?;
            push_bounded(&mut stacks.undo, current, self.max_history);
            stacks.stage = Some(restored.clone());
            tracing::debug!(
                target: targets::HISTORY,
                undo_depth = stacks.undo.len(),
                redo_remaining = stacks.redo.len(),
                "redo"
            );
            restored
        };

        self.events.notify(TreeEvent::TreeRedo {
            tree_data: restored.clone(),
        });
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.stacks.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.stacks.lock().redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.stacks.lock().undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.stacks.lock().redo.len()
    }

    /// The current snapshot, if an initial state was set.
    pub fn stage(&self) -> Option<TreeData> {
        self.stacks.lock().stage.clone()
    }

    /// Copies of the undo stack, oldest first.
    pub fn undo_snapshots(&self) -> Vec<TreeData> {
        self.stacks.lock().undo.iter().cloned().collect()
    }

    /// Copies of the redo stack, oldest first.
    pub fn redo_snapshots(&self) -> Vec<TreeData> {
        self.stacks.lock().redo.iter().cloned().collect()
    }

    /// Drops both stacks; the stage is kept.
    pub fn clear(&self) {
        let mut stacks = self.stacks.lock();
        stacks.undo.clear();
        stacks.redo.clear();
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stacks = self.stacks.lock();
        f.debug_struct("StateManager")
            .field("undo_depth", &stacks.undo.len())
            .field("redo_depth", &stacks.redo.len())
            .field("max_history", &self.max_history)
            .finish()
    }
}
