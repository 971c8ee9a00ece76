//! Bridge from view-model signals to a concrete UI.

use std::sync::Arc;

use macrokit_core::ConnectionGuard;

use crate::model::{ItemDto, ItemId, TreeData};

use super::signals::ViewModelSignals;

/// Receives view-model notifications on behalf of a UI toolkit.
///
/// Every method defaults to doing nothing; implement the ones the view needs.
pub trait TreeViewAdapter: Send + Sync {
    fn on_item_added(&self, _item_id: &ItemId, _parent_id: &ItemId, _index: usize) {}

    fn on_item_removed(&self, _item_id: &ItemId, _parent_id: &ItemId, _removed_ids: &[ItemId]) {}

    fn on_item_moved(
        &self,
        _item_id: &ItemId,
        _old_parent_id: &ItemId,
        _new_parent_id: &ItemId,
        _new_index: usize,
    ) {
    }

    fn on_item_modified(&self, _item_id: &ItemId, _changes: &ItemDto) {}

    fn on_tree_reset(&self) {}

    fn on_tree_changed(&self, _tree_data: &TreeData) {}

    /// The whole tree was replaced; redraw from `tree_data`.
    fn on_tree_rebuilt(&self, _tree_data: &TreeData) {}

    fn on_selection_changed(&self, _selected: &[ItemId], _deselected: &[ItemId]) {}

    fn on_history_changed(&self, _can_undo: bool, _can_redo: bool) {}

    fn on_error(&self, _message: &str) {}
}

/// Keeps an adapter wired to the view-model; dropping it disconnects.
#[must_use = "dropping the connection detaches the adapter immediately"]
pub struct AdapterConnection {
    guards: Vec<ConnectionGuard>,
}

impl AdapterConnection {
    pub(crate) fn attach(signals: &ViewModelSignals, adapter: Arc<dyn TreeViewAdapter>) -> Self {
        let a = adapter.clone();
        let mut guards = vec![signals.item_added.connect_scoped(move |(item, parent, index)| {
            a.on_item_added(item, parent, *index)
        })];

        let a = adapter.clone();
        guards.push(signals.item_removed.connect_scoped(move |(item, parent, removed)| {
            a.on_item_removed(item, parent, removed)
        }));

        let a = adapter.clone();
        guards.push(signals.item_moved.connect_scoped(move |(item, old, new, index)| {
            a.on_item_moved(item, old, new, *index)
        }));

        let a = adapter.clone();
        guards.push(
            signals
                .item_modified
                .connect_scoped(move |(item, changes)| a.on_item_modified(item, changes)),
        );

        let a = adapter.clone();
        guards.push(signals.tree_reset.connect_scoped(move |_| a.on_tree_reset()));

        let a = adapter.clone();
        guards.push(signals.tree_changed.connect_scoped(move |data| a.on_tree_changed(data)));

        let a = adapter.clone();
        guards.push(signals.tree_rebuilt.connect_scoped(move |data| a.on_tree_rebuilt(data)));

        let a = adapter.clone();
        guards.push(
            signals
                .selection_changed
                .connect_scoped(move |(selected, deselected)| {
                    a.on_selection_changed(selected, deselected)
                }),
        );

        let a = adapter.clone();
        guards.push(
            signals
                .history_changed
                .connect_scoped(move |(can_undo, can_redo)| a.on_history_changed(*can_undo, *can_redo)),
        );

        let a = adapter;
        guards.push(signals.error_occurred.connect_scoped(move |message| a.on_error(message)));

        Self { guards }
    }

    /// Number of signals the adapter is wired to.
    pub fn connection_count(&self) -> usize {
        self.guards.len()
    }

    /// Detaches the adapter now.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl std::fmt::Debug for AdapterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConnection")
            .field("connections", &self.guards.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl TreeViewAdapter for Recorder {
        fn on_item_added(&self, item_id: &ItemId, _parent_id: &ItemId, index: usize) {
            self.calls.lock().push(format!("added {item_id} at {index}"));
        }

        fn on_history_changed(&self, can_undo: bool, can_redo: bool) {
            self.calls.lock().push(format!("history {can_undo} {can_redo}"));
        }
    }

    #[test]
    fn test_attach_and_drop() {
        let signals = ViewModelSignals::new();
        let recorder = Arc::new(Recorder::default());

        let connection = AdapterConnection::attach(&signals, recorder.clone());
        assert_eq!(connection.connection_count(), 10);

        signals.item_added.emit((ItemId::new("a"), ItemId::dummy_root(), 0));
        signals.history_changed.emit((true, false));
        signals.tree_reset.emit(());

        connection.disconnect();
        signals.item_added.emit((ItemId::new("b"), ItemId::dummy_root(), 1));

        assert_eq!(*recorder.calls.lock(), ["added a at 0", "history true false"]);
        assert_eq!(signals.item_added.connection_count(), 0);
    }
}
