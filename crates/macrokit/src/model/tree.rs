//! The hierarchical macro tree.
//!
//! A [`Tree`] owns its items and keeps them coherent: every item except the
//! dummy root has exactly one parent, parents list their children in display
//! order, and following parents always reaches the dummy root.
//!
//! Every successful mutation announces itself through the tree's
//! [`TreeEventManager`], first with a fine-grained event and then with a
//! [`TreeEvent::TreeCrud`] snapshot. A failed mutation changes nothing and
//! announces nothing.
//!
//! # Example
//!
//! ```
//! use macrokit::model::{ItemDto, Tree};
//!
//! let tree = Tree::new("t1", "Login");
//! let group = tree.add_item(ItemDto::group("Open app"), None, -1).unwrap();
//! tree.add_item(ItemDto::instruction("Click icon"), Some(&group), -1).unwrap();
//!
//! assert_eq!(tree.get_children(None).len(), 1);
//! assert_eq!(tree.get_children(Some(&group))[0].name(), "Click icon");
//! ```

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use macrokit_core::PerfSpan;
use macrokit_core::logging::{span_names, targets};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::error::{TreeError, TreeResult};

use super::data::TreeData;
use super::event::{TreeEvent, TreeEventManager};
use super::id::{IdGenerator, ItemId, UuidGenerator};
use super::item::{Item, ItemDto};

/// Where to insert an item among its new siblings.
///
/// Converting from a signed integer maps every negative value to `Append`,
/// so `-1` reads as "at the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Append,
    /// Insert at this offset; offsets past the end append.
    At(usize),
}

impl Position {
    /// Resolves the position against a sibling list of length `len`.
    pub fn resolve(self, len: usize) -> usize {
        match self {
            Position::Append => len,
            Position::At(index) => index.min(len),
        }
    }
}

impl From<usize> for Position {
    fn from(index: usize) -> Self {
        Position::At(index)
    }
}

impl From<isize> for Position {
    fn from(index: isize) -> Self {
        usize::try_from(index).map_or(Position::Append, Position::At)
    }
}

impl From<i32> for Position {
    fn from(index: i32) -> Self {
        usize::try_from(index).map_or(Position::Append, Position::At)
    }
}

impl From<Option<usize>> for Position {
    fn from(index: Option<usize>) -> Self {
        index.map_or(Position::Append, Position::At)
    }
}

struct TreeState {
    id: String,
    name: String,
    root_id: ItemId,
    items: BTreeMap<ItemId, Item>,
}

impl TreeState {
    fn from_data(data: TreeData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            root_id: data.root_id,
            items: data.items,
        }
    }

    fn to_data(&self) -> TreeData {
        TreeData {
            id: self.id.clone(),
            name: self.name.clone(),
            root_id: self.root_id.clone(),
            items: self.items.clone(),
        }
    }

    fn resolve_parent(&self, parent_id: Option<&ItemId>) -> ItemId {
        parent_id.cloned().unwrap_or_else(|| self.root_id.clone())
    }

    fn children(&self, parent_id: &ItemId) -> &[ItemId] {
        self.items
            .get(parent_id)
            .map(Item::children_ids)
            .unwrap_or_default()
    }

    fn index_of(&self, id: &ItemId) -> Option<usize> {
        let parent_id = self.items.get(id)?.parent_id()?;
        self.children(parent_id).iter().position(|child| child == id)
    }

    /// Walks up from `candidate`; true if `ancestor` is met on the way.
    fn is_descendant(&self, candidate: &ItemId, ancestor: &ItemId) -> bool {
        let mut current = self.items.get(candidate).and_then(Item::parent_id);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.items.len() {
                break;
            }
            current = self.items.get(id).and_then(Item::parent_id);
        }
        false
    }

    /// Breadth-first ids below `start`, `start` itself excluded.
    fn descendants(&self, start: &ItemId) -> Vec<ItemId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&ItemId> = self.children(start).iter().collect();
        let mut result = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            result.push(id.clone());
            queue.extend(self.children(id));
        }
        result
    }

    fn reset(&mut self) {
        self.items.clear();
        let root = Item::dummy_root();
        self.root_id = root.id().clone();
        self.items.insert(self.root_id.clone(), root);
    }
}

/// A rooted tree of macro items.
///
/// All methods take `&self`; state lives behind an internal lock that is
/// always released before events are delivered, so subscribers may call the
/// read-only methods from a callback. Mutating the tree from one of its own
/// callbacks fails with [`TreeError::ReentrantMutation`].
///
/// Mutations from different threads are serialized: each one runs and
/// delivers all of its events before the next one starts.
pub struct Tree {
    state: RwLock<TreeState>,
    events: Option<TreeEventManager>,
    ids: Arc<dyn IdGenerator>,
    /// Held from the start of a mutation until its events are delivered.
    /// The cell is set while events are being delivered.
    gate: ReentrantMutex<Cell<bool>>,
}

type MutationGate<'a> = ReentrantMutexGuard<'a, Cell<bool>>;

static_assertions::assert_impl_all!(Tree: Send, Sync);

impl Tree {
    /// Creates a tree holding only the dummy root.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_state(TreeState::from_data(TreeData::empty(id, name)))
    }

    fn from_state(state: TreeState) -> Self {
        Self {
            state: RwLock::new(state),
            events: None,
            ids: Arc::new(UuidGenerator),
            gate: ReentrantMutex::new(Cell::new(false)),
        }
    }

    /// Announces changes through `events`.
    pub fn with_event_manager(mut self, events: TreeEventManager) -> Self {
        self.events = Some(events);
        self
    }

    /// Draws new item ids from `ids` instead of random UUIDs.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces (or, with `None`, detaches) the broker changes are announced on.
    pub fn set_event_manager(&mut self, events: Option<TreeEventManager>) {
        self.events = events;
    }

    /// The broker changes are announced on, if any.
    pub fn event_manager(&self) -> Option<&TreeEventManager> {
        self.events.as_ref()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The tree's id, also its default key in a store.
    pub fn id(&self) -> String {
        self.state.read().id.clone()
    }

    /// The display name.
    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    /// Id of the dummy root every top-level item hangs from.
    pub fn root_id(&self) -> ItemId {
        self.state.read().root_id.clone()
    }

    /// Number of items, the dummy root excluded.
    pub fn len(&self) -> usize {
        self.state.read().items.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an item with this id exists; true for the dummy root.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.state.read().items.contains_key(id)
    }

    /// Returns a copy of the item.
    pub fn get_item(&self, id: &ItemId) -> Option<Item> {
        self.state.read().items.get(id).cloned()
    }

    /// Copies of the children of `parent_id` (the dummy root for `None`), in order.
    ///
    /// An unknown parent has no children.
    pub fn get_children(&self, parent_id: Option<&ItemId>) -> Vec<Item> {
        let state = self.state.read();
        let parent_id = state.resolve_parent(parent_id);
        state
            .children(&parent_id)
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect()
    }

    /// Id of the item's parent; `None` for the dummy root and unknown ids.
    pub fn parent_of(&self, id: &ItemId) -> Option<ItemId> {
        self.state.read().items.get(id)?.parent_id().cloned()
    }

    /// Position of the item among its siblings.
    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.state.read().index_of(id)
    }

    /// Ancestors of the item, nearest first, ending with the dummy root.
    pub fn ancestors(&self, id: &ItemId) -> Vec<ItemId> {
        let state = self.state.read();
        let mut result = Vec::new();
        let mut current = state.items.get(id).and_then(Item::parent_id);
        while let Some(parent) = current {
            if result.contains(parent) {
                break;
            }
            result.push(parent.clone());
            current = state.items.get(parent).and_then(Item::parent_id);
        }
        result
    }

    /// Distance from the dummy root, which has depth 0.
    pub fn depth(&self, id: &ItemId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        Some(self.ancestors(id).len())
    }

    /// Whether `candidate` lies strictly below `ancestor`.
    pub fn is_descendant(&self, candidate: &ItemId, ancestor: &ItemId) -> bool {
        self.state.read().is_descendant(candidate, ancestor)
    }

    /// Ids below `id` in breadth-first order, `id` itself excluded.
    pub fn descendants(&self, id: &ItemId) -> Vec<ItemId> {
        self.state.read().descendants(id)
    }

    /// Visits every item reachable from `start_id` (the dummy root for
    /// `None`) breadth-first, the start item included. Returns the number of
    /// items visited.
    ///
    /// Items are copied out before the visitor runs, so the visitor may call
    /// back into the tree.
    pub fn traverse<F>(&self, mut visitor: F, start_id: Option<&ItemId>) -> TreeResult<usize>
    where
        F: FnMut(&Item),
    {
        let items: Vec<Item> = {
            let state = self.state.read();
            let start = state.resolve_parent(start_id);
            let first = state
                .items
                .get(&start)
                .ok_or_else(|| TreeError::ItemNotFound(start.clone()))?;
            std::iter::once(first.clone())
                .chain(
                    state
                        .descendants(&start)
                        .iter()
                        .filter_map(|id| state.items.get(id).cloned()),
                )
                .collect()
        };
        for item in &items {
            visitor(item);
        }
        Ok(items.len())
    }

    /// Instructions below `start_id` in replay order.
    ///
    /// Depth-first in sibling order. Hidden items are skipped together with
    /// everything beneath them.
    pub fn execution_order(&self, start_id: Option<&ItemId>) -> TreeResult<Vec<Item>> {
        let state = self.state.read();
        let start = state.resolve_parent(start_id);
        if !state.items.contains_key(&start) {
            return Err(TreeError::ItemNotFound(start));
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![&start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(item) = state.items.get(id) else {
                continue;
            };
            if !item.is_visible() {
                continue;
            }
            if item.is_instruction() {
                order.push(item.clone());
            }
            stack.extend(item.children_ids().iter().rev());
        }
        Ok(order)
    }

    /// Checks the structural invariants of the current state.
    pub fn validate(&self) -> TreeResult<()> {
        self.to_dict().validate()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Waits for mutations running on other threads, then rejects a
    /// mutation started from one of this tree's own callbacks.
    fn begin_mutation(&self, operation: &'static str) -> TreeResult<MutationGate<'_>> {
        let gate = self.gate.lock();
        if gate.get() {
            tracing::error!(
                target: targets::TREE,
                operation,
                "tree mutated from inside one of its own event callbacks"
            );
            return Err(TreeError::ReentrantMutation);
        }
        Ok(gate)
    }

    /// Snapshot for the `TreeCrud` event, taken only when someone may listen.
    fn crud_snapshot(&self, state: &TreeState) -> Option<TreeData> {
        self.events.as_ref()?;
        let _span = PerfSpan::new(span_names::SERIALIZE);
        Some(state.to_data())
    }

    fn announce(&self, gate: &MutationGate<'_>, event: Option<TreeEvent>, snapshot: Option<TreeData>) {
        let Some(events) = &self.events else {
            return;
        };
        gate.set(true);
        if let Some(event) = event {
            events.notify(event);
        }
        if let Some(tree_data) = snapshot {
            events.notify(TreeEvent::TreeCrud { tree_data });
        }
        gate.set(false);
    }

    /// Whether the calling thread is inside one of this tree's callbacks.
    pub fn is_notifying(&self) -> bool {
        self.gate.try_lock().is_some_and(|gate| gate.get())
    }

    /// Runs `f` while no other thread can mutate the tree.
    ///
    /// `f` may itself mutate the tree. Fails with
    /// [`TreeError::ReentrantMutation`] when called from one of the tree's
    /// own callbacks, without running `f`.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> TreeResult<R> {
        let _gate = self.begin_mutation("exclusive")?;
        Ok(f())
    }

    /// Creates an item from `dto` under `parent_id` (the dummy root for
    /// `None`) at `index`, and returns its new id.
    ///
    /// The new item starts without children; any parent or children in the
    /// DTO are ignored.
    pub fn add_item(
        &self,
        dto: ItemDto,
        parent_id: Option<&ItemId>,
        index: impl Into<Position>,
    ) -> TreeResult<ItemId> {
        let gate = self.begin_mutation("add_item")?;
        let position = index.into();

        let (item_id, event, snapshot) = {
            let mut state = self.state.write();
            let parent_id = state.resolve_parent(parent_id);
            if !state.items.contains_key(&parent_id) {
                return Err(TreeError::ParentNotFound(parent_id));
            }
            let item_id = self.ids.next_id();
            if state.items.contains_key(&item_id) {
                return Err(TreeError::DuplicateId(item_id));
            }

            let mut item = Item::from_dto(item_id.clone(), dto);
            item.domain_mut().parent_id = Some(parent_id.clone());
            item.domain_mut().children_ids.clear();

            let Some(parent) = state.items.get_mut(&parent_id) else {
                return Err(TreeError::ParentNotFound(parent_id));
            };
            let siblings = &mut parent.domain_mut().children_ids;
            let index = position.resolve(siblings.len());
            siblings.insert(index, item_id.clone());
            state.items.insert(item_id.clone(), item);

            tracing::debug!(
                target: targets::TREE,
                item_id = %item_id,
                parent_id = %parent_id,
                index,
                "item added"
            );
            let event = TreeEvent::ItemAdded {
                item_id: item_id.clone(),
                parent_id,
                index,
            };
            (item_id, event, self.crud_snapshot(&state))
        };

        self.announce(&gate, Some(event), snapshot);
        Ok(item_id)
    }

    /// Removes the item and everything beneath it.
    pub fn remove_item(&self, id: &ItemId) -> TreeResult<()> {
        let gate = self.begin_mutation("remove_item")?;

        let (event, snapshot) = {
            let mut state = self.state.write();
            if id == &state.root_id {
                return Err(TreeError::CannotRemoveDummyRoot);
            }
            let Some(item) = state.items.get(id) else {
                return Err(TreeError::ItemNotFound(id.clone()));
            };
            let parent_id = item
                .parent_id()
                .cloned()
                .unwrap_or_else(|| state.root_id.clone());
            let index = state.index_of(id).unwrap_or_default();

            let mut removed_ids = vec![id.clone()];
            removed_ids.extend(state.descendants(id));
            if let Some(parent) = state.items.get_mut(&parent_id) {
                parent.domain_mut().children_ids.retain(|child| child != id);
            }
            for removed in &removed_ids {
                state.items.remove(removed);
            }

            tracing::debug!(
                target: targets::TREE,
                item_id = %id,
                parent_id = %parent_id,
                removed = removed_ids.len(),
                "item removed"
            );
            let event = TreeEvent::ItemRemoved {
                item_id: id.clone(),
                parent_id,
                index,
                removed_ids,
            };
            (event, self.crud_snapshot(&state))
        };

        self.announce(&gate, Some(event), snapshot);
        Ok(())
    }

    /// Moves the item under `new_parent_id` (the dummy root for `None`) at
    /// `new_index`; also reorders within the same parent.
    ///
    /// Returns `Ok(false)` without announcing anything when the item is asked
    /// to be appended to the parent it already has.
    pub fn move_item(
        &self,
        id: &ItemId,
        new_parent_id: Option<&ItemId>,
        new_index: impl Into<Position>,
    ) -> TreeResult<bool> {
        let gate = self.begin_mutation("move_item")?;
        let position = new_index.into();

        let (event, snapshot) = {
            let mut state = self.state.write();
            if id == &state.root_id {
                return Err(TreeError::CannotMoveDummyRoot);
            }
            let Some(item) = state.items.get(id) else {
                return Err(TreeError::ItemNotFound(id.clone()));
            };
            let old_parent_id = item
                .parent_id()
                .cloned()
                .unwrap_or_else(|| state.root_id.clone());
            let new_parent_id = state.resolve_parent(new_parent_id);
            if !state.items.contains_key(&new_parent_id) {
                return Err(TreeError::ParentNotFound(new_parent_id));
            }

            let old_index = state.index_of(id);
            if new_parent_id == old_parent_id && position == Position::Append && old_index.is_some() {
                return Ok(false);
            }
            if &new_parent_id == id || state.is_descendant(&new_parent_id, id) {
                return Err(TreeError::CycleDetected {
                    item_id: id.clone(),
                    new_parent_id,
                });
            }

            if let Some(old_parent) = state.items.get_mut(&old_parent_id) {
                old_parent.domain_mut().children_ids.retain(|child| child != id);
            }
            let Some(new_parent) = state.items.get_mut(&new_parent_id) else {
                return Err(TreeError::ParentNotFound(new_parent_id));
            };
            let siblings = &mut new_parent.domain_mut().children_ids;
            let new_index = position.resolve(siblings.len());
            siblings.insert(new_index, id.clone());
            if let Some(item) = state.items.get_mut(id) {
                item.domain_mut().parent_id = Some(new_parent_id.clone());
            }

            tracing::debug!(
                target: targets::TREE,
                item_id = %id,
                old_parent_id = %old_parent_id,
                new_parent_id = %new_parent_id,
                new_index,
                "item moved"
            );
            let event = TreeEvent::ItemMoved {
                item_id: id.clone(),
                old_parent_id,
                new_parent_id,
                old_index: old_index.unwrap_or_default(),
                new_index,
            };
            (event, self.crud_snapshot(&state))
        };

        self.announce(&gate, Some(event), snapshot);
        Ok(true)
    }

    /// Replaces the item's domain and UI data with the DTO's.
    ///
    /// The item keeps its parent and children; structure only changes
    /// through add, remove and move.
    pub fn modify_item(&self, id: &ItemId, dto: ItemDto) -> TreeResult<()> {
        let gate = self.begin_mutation("modify_item")?;

        let (event, snapshot) = {
            let mut state = self.state.write();
            if id == &state.root_id {
                return Err(TreeError::CannotModifyDummyRoot);
            }
            let Some(item) = state.items.get_mut(id) else {
                return Err(TreeError::ItemNotFound(id.clone()));
            };

            let ItemDto { mut domain, ui } = dto;
            domain.parent_id = item.domain().parent_id.clone();
            domain.children_ids = item.domain().children_ids.clone();
            item.set_domain(domain);
            item.set_ui(ui);
            let changes = item.to_dto();

            tracing::debug!(target: targets::TREE, item_id = %id, "item modified");
            let event = TreeEvent::ItemModified {
                item_id: id.clone(),
                changes,
            };
            (event, self.crud_snapshot(&state))
        };

        self.announce(&gate, Some(event), snapshot);
        Ok(())
    }

    /// Removes every item except the dummy root.
    pub fn reset_tree(&self) -> TreeResult<()> {
        let gate = self.begin_mutation("reset_tree")?;

        let snapshot = {
            let mut state = self.state.write();
            let removed = state.items.len().saturating_sub(1);
            state.reset();
            tracing::debug!(target: targets::TREE, removed, "tree reset");
            self.crud_snapshot(&state)
        };

        self.announce(&gate, Some(TreeEvent::TreeReset), snapshot);
        Ok(())
    }

    /// Renames the tree. Announces only a `TreeCrud` snapshot.
    pub fn set_name(&self, name: impl Into<String>) -> TreeResult<()> {
        let gate = self.begin_mutation("set_name")?;

        let snapshot = {
            let mut state = self.state.write();
            state.name = name.into();
            tracing::debug!(target: targets::TREE, name = %state.name, "tree renamed");
            self.crud_snapshot(&state)
        };

        self.announce(&gate, None, snapshot);
        Ok(())
    }

    /// Replaces the whole state with `data`, announcing nothing.
    ///
    /// Used to restore undo/redo snapshots; whoever restores is responsible
    /// for telling observers.
    pub fn dict_to_state(&self, data: TreeData) -> TreeResult<()> {
        let _gate = self.begin_mutation("dict_to_state")?;
        data.validate()?;
        let mut state = self.state.write();
        *state = TreeState::from_data(data);
        tracing::debug!(
            target: targets::TREE,
            items = state.items.len().saturating_sub(1),
            "tree state restored"
        );
        Ok(())
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// An independently owned snapshot of the tree.
    pub fn to_dict(&self) -> TreeData {
        self.state.read().to_data()
    }

    /// Builds a tree from a snapshot, validating it first.
    ///
    /// The tree has no event manager.
    pub fn from_dict(data: TreeData) -> TreeResult<Self> {
        data.validate()?;
        Ok(Self::from_state(TreeState::from_data(data)))
    }

    /// The snapshot as a JSON value.
    pub fn to_value(&self) -> TreeResult<serde_json::Value> {
        Ok(serde_json::to_value(self.to_dict())?)
    }

    /// Builds a tree from a JSON value, validating it first.
    pub fn from_value(value: serde_json::Value) -> TreeResult<Self> {
        Self::from_dict(serde_json::from_value(value)?)
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> TreeResult<String> {
        let _span = PerfSpan::new(span_names::SERIALIZE);
        self.to_dict().to_json()
    }

    /// Parses and validates a JSON document produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> TreeResult<Self> {
        let _span = PerfSpan::new(span_names::SERIALIZE);
        Self::from_dict(TreeData::from_json(json)?)
    }
}

impl Clone for Tree {
    /// A structurally independent copy with no event manager.
    fn clone(&self) -> Self {
        let state = TreeState::from_data(self.to_dict());
        Self {
            state: RwLock::new(state),
            events: None,
            ids: Arc::clone(&self.ids),
            gate: ReentrantMutex::new(Cell::new(false)),
        }
    }
}

impl PartialEq for Tree {
    /// Structural equality; event managers are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.to_dict() == other.to_dict()
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Tree")
            .field("id", &state.id)
            .field("name", &state.name)
            .field("items", &state.items.len().saturating_sub(1))
            .field("has_event_manager", &self.events.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MouseAction, SequentialIdGenerator, TreeEventKind};
    use parking_lot::Mutex;

    fn tree() -> Tree {
        Tree::new("t", "T").with_id_generator(Arc::new(SequentialIdGenerator::default()))
    }

    fn names(items: &[Item]) -> Vec<String> {
        items.iter().map(|item| item.name().to_string()).collect()
    }

    fn recorded(events: &TreeEventManager) -> Arc<Mutex<Vec<TreeEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in TreeEventKind::ITEM_KINDS.into_iter().chain([TreeEventKind::TreeCrud]) {
            let log = log.clone();
            events.subscribe(kind, move |event| log.lock().push(event.clone()));
        }
        log
    }

    #[test]
    fn test_position_conversions() {
        assert_eq!(Position::from(-1), Position::Append);
        assert_eq!(Position::from(-7isize), Position::Append);
        assert_eq!(Position::from(2), Position::At(2));
        assert_eq!(Position::At(10).resolve(3), 3);
        assert_eq!(Position::Append.resolve(3), 3);
        assert_eq!(Position::At(1).resolve(3), 1);
    }

    #[test]
    fn test_add_item_positions() {
        let tree = tree();
        let a = tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        tree.add_item(ItemDto::group("B"), None, -1).unwrap();
        tree.add_item(ItemDto::group("C"), None, 0).unwrap();
        tree.add_item(ItemDto::group("D"), None, 99).unwrap();
        tree.add_item(ItemDto::group("E"), None, -5).unwrap();

        assert_eq!(names(&tree.get_children(None)), ["C", "A", "B", "D", "E"]);
        assert_eq!(a.as_str(), "item-1");
        assert_eq!(tree.len(), 5);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_add_item_ignores_dto_structure() {
        let tree = tree();
        let mut dto = ItemDto::group("A");
        dto.domain.children_ids.push(ItemId::new("ghost"));
        dto.domain.parent_id = Some(ItemId::new("ghost"));
        let a = tree.add_item(dto, None, -1).unwrap();

        let item = tree.get_item(&a).unwrap();
        assert!(item.children_ids().is_empty());
        assert_eq!(item.parent_id(), Some(&ItemId::dummy_root()));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_add_item_unknown_parent() {
        let events = TreeEventManager::new();
        let log = recorded(&events);
        let tree = tree().with_event_manager(events);

        let err = tree
            .add_item(ItemDto::group("A"), Some(&ItemId::new("nope")), -1)
            .unwrap_err();
        assert!(matches!(err, TreeError::ParentNotFound(_)));
        assert!(tree.is_empty());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_events_fine_grained_before_crud() {
        let events = TreeEventManager::new();
        let log = recorded(&events);
        let tree = tree().with_event_manager(events);

        let a = tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[0],
            TreeEvent::ItemAdded {
                item_id: a,
                parent_id: ItemId::dummy_root(),
                index: 0
            }
        );
        assert_eq!(log[1].tree_data(), Some(&tree.to_dict()));
    }

    #[test]
    fn test_get_children_unknown_parent_is_empty() {
        let tree = tree();
        assert!(tree.get_children(Some(&ItemId::new("nope"))).is_empty());
    }

    #[test]
    fn test_remove_root_and_missing() {
        let tree = tree();
        assert!(matches!(
            tree.remove_item(&ItemId::dummy_root()),
            Err(TreeError::CannotRemoveDummyRoot)
        ));
        assert!(matches!(
            tree.remove_item(&ItemId::new("nope")),
            Err(TreeError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_move_same_parent_append_is_noop() {
        let events = TreeEventManager::new();
        let log = recorded(&events);
        let tree = tree().with_event_manager(events);
        let a = tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        tree.add_item(ItemDto::group("B"), None, -1).unwrap();
        log.lock().clear();

        assert!(!tree.move_item(&a, None, -1).unwrap());
        assert!(log.lock().is_empty());
        assert_eq!(names(&tree.get_children(None)), ["A", "B"]);
    }

    #[test]
    fn test_move_reorders_within_parent() {
        let tree = tree();
        let a = tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        tree.add_item(ItemDto::group("B"), None, -1).unwrap();
        tree.add_item(ItemDto::group("C"), None, -1).unwrap();

        assert!(tree.move_item(&a, None, 2).unwrap());
        assert_eq!(names(&tree.get_children(None)), ["B", "C", "A"]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_move_errors() {
        let tree = tree();
        let a = tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        assert!(matches!(
            tree.move_item(&ItemId::dummy_root(), Some(&a), -1),
            Err(TreeError::CannotMoveDummyRoot)
        ));
        assert!(matches!(
            tree.move_item(&ItemId::new("x"), None, 0),
            Err(TreeError::ItemNotFound(_))
        ));
        assert!(matches!(
            tree.move_item(&a, Some(&ItemId::new("x")), 0),
            Err(TreeError::ParentNotFound(_))
        ));
        assert!(matches!(
            tree.move_item(&a, Some(&a), 0),
            Err(TreeError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_modify_keeps_structure() {
        let tree = tree();
        let g = tree.add_item(ItemDto::group("G"), None, -1).unwrap();
        let i = tree.add_item(ItemDto::instruction("I"), Some(&g), -1).unwrap();

        tree.modify_item(&g, ItemDto::group("Renamed").expanded(true)).unwrap();

        let item = tree.get_item(&g).unwrap();
        assert_eq!(item.name(), "Renamed");
        assert!(item.ui().is_expanded);
        assert_eq!(item.children_ids(), [i]);
        assert!(matches!(
            tree.modify_item(&ItemId::dummy_root(), ItemDto::group("x")),
            Err(TreeError::CannotModifyDummyRoot)
        ));
        assert!(matches!(
            tree.modify_item(&ItemId::new("x"), ItemDto::group("x")),
            Err(TreeError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_reset_tree() {
        let events = TreeEventManager::new();
        let log = recorded(&events);
        let tree = tree().with_event_manager(events);
        let g = tree.add_item(ItemDto::group("G"), None, -1).unwrap();
        tree.add_item(ItemDto::instruction("I"), Some(&g), -1).unwrap();
        log.lock().clear();

        tree.reset_tree().unwrap();

        assert!(tree.is_empty());
        assert!(tree.get_children(None).is_empty());
        let log = log.lock();
        assert_eq!(log[0], TreeEvent::TreeReset);
        assert!(matches!(log[1], TreeEvent::TreeCrud { .. }));
    }

    #[test]
    fn test_queries() {
        let tree = tree();
        let g = tree.add_item(ItemDto::group("G"), None, -1).unwrap();
        let h = tree.add_item(ItemDto::group("H"), Some(&g), -1).unwrap();
        let i = tree.add_item(ItemDto::instruction("I"), Some(&h), -1).unwrap();
        let j = tree.add_item(ItemDto::instruction("J"), Some(&g), -1).unwrap();

        assert_eq!(tree.parent_of(&i), Some(h.clone()));
        assert_eq!(tree.index_of(&j), Some(1));
        assert_eq!(tree.ancestors(&i), [h.clone(), g.clone(), ItemId::dummy_root()]);
        assert_eq!(tree.depth(&i), Some(3));
        assert_eq!(tree.depth(&ItemId::dummy_root()), Some(0));
        assert_eq!(tree.depth(&ItemId::new("x")), None);
        assert!(tree.is_descendant(&i, &g));
        assert!(!tree.is_descendant(&g, &i));
        assert_eq!(tree.descendants(&g), [h, j, i]);
    }

    #[test]
    fn test_traverse_breadth_first() {
        let tree = tree();
        let g = tree.add_item(ItemDto::group("G"), None, -1).unwrap();
        tree.add_item(ItemDto::instruction("I"), Some(&g), -1).unwrap();
        tree.add_item(ItemDto::group("H"), None, -1).unwrap();

        let mut seen = Vec::new();
        let count = tree.traverse(|item| seen.push(item.name().to_string()), None).unwrap();
        assert_eq!(count, 4);
        assert_eq!(seen, ["root", "G", "H", "I"]);

        let mut seen = Vec::new();
        tree.traverse(|item| seen.push(item.name().to_string()), Some(&g)).unwrap();
        assert_eq!(seen, ["G", "I"]);

        assert!(tree.traverse(|_| {}, Some(&ItemId::new("x"))).is_err());
    }

    #[test]
    fn test_execution_order_skips_hidden() {
        let tree = tree();
        let g = tree.add_item(ItemDto::group("G"), None, -1).unwrap();
        tree.add_item(ItemDto::instruction("1").with_action(MouseAction::Click), Some(&g), -1)
            .unwrap();
        let hidden = tree.add_item(ItemDto::group("hidden").visible(false), Some(&g), -1).unwrap();
        tree.add_item(ItemDto::instruction("skipped"), Some(&hidden), -1).unwrap();
        tree.add_item(ItemDto::instruction("2"), Some(&g), -1).unwrap();
        tree.add_item(ItemDto::instruction("off").visible(false), None, -1).unwrap();
        tree.add_item(ItemDto::instruction("3"), None, -1).unwrap();

        let order = tree.execution_order(None).unwrap();
        assert_eq!(names(&order), ["1", "2", "3"]);
        assert_eq!(names(&tree.execution_order(Some(&g)).unwrap()), ["1", "2"]);
    }

    #[test]
    fn test_set_name_emits_crud_only() {
        let events = TreeEventManager::new();
        let log = recorded(&events);
        let tree = tree().with_event_manager(events);

        tree.set_name("Renamed").unwrap();
        assert_eq!(tree.name(), "Renamed");
        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].tree_data().map(|d| d.name.as_str()), Some("Renamed"));
    }

    #[test]
    fn test_reentrant_mutation_rejected() {
        let events = TreeEventManager::new();
        let tree = Arc::new(tree().with_event_manager(events.clone()));
        let outcome = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&tree);
        let outcome_clone = outcome.clone();
        events.subscribe(TreeEventKind::ItemAdded, move |_| {
            if let Some(tree) = weak.upgrade() {
                assert_eq!(tree.len(), 1);
                let result = tree.add_item(ItemDto::group("nested"), None, -1);
                *outcome_clone.lock() = Some(result.is_err());
            }
        });

        tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        assert_eq!(*outcome.lock(), Some(true));
        assert_eq!(tree.len(), 1);

        tree.add_item(ItemDto::group("B"), None, -1).unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_dict_to_state_is_silent() {
        let events = TreeEventManager::new();
        let log = recorded(&events);
        let tree = tree().with_event_manager(events);
        let snapshot = tree.to_dict();
        tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        log.lock().clear();

        tree.dict_to_state(snapshot.clone()).unwrap();
        assert_eq!(tree.to_dict(), snapshot);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_from_dict_rejects_invalid() {
        let mut data = TreeData::empty("t", "T");
        data.root_id = ItemId::new("other");
        assert!(matches!(Tree::from_dict(data), Err(TreeError::InvalidPayload(_))));
        assert!(Tree::from_json("{ not json").is_err());
    }

    #[test]
    fn test_clone_detaches_events() {
        let events = TreeEventManager::new();
        let tree = tree().with_event_manager(events);
        tree.add_item(ItemDto::group("A"), None, -1).unwrap();

        let copy = tree.clone();
        assert!(copy.event_manager().is_none());
        assert!(tree.event_manager().is_some());
        assert_eq!(copy, tree);
    }

    #[test]
    fn test_exclusive_rejected_from_callback() {
        let events = TreeEventManager::new();
        let tree = Arc::new(tree().with_event_manager(events.clone()));
        let seen = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&tree);
        let seen_clone = seen.clone();
        events.subscribe(TreeEventKind::ItemAdded, move |_| {
            if let Some(tree) = weak.upgrade() {
                let ran = tree.exclusive(|| ()).is_ok();
                *seen_clone.lock() = Some((tree.is_notifying(), ran));
            }
        });

        assert!(!tree.is_notifying());
        tree.add_item(ItemDto::group("A"), None, -1).unwrap();
        assert_eq!(*seen.lock(), Some((true, false)));

        let restored = tree
            .exclusive(|| tree.dict_to_state(TreeData::empty("t", "T")))
            .unwrap();
        assert!(restored.is_ok());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_other_threads_wait_for_delivery() {
        let events = TreeEventManager::new();
        let tree = Arc::new(tree().with_event_manager(events.clone()));

        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let entered_tx = Mutex::new(Some(entered_tx));
        events.subscribe(TreeEventKind::ItemAdded, move |_| {
            if let Some(tx) = entered_tx.lock().take() {
                let _ = tx.send(());
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        });
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sizes_clone = sizes.clone();
        events.subscribe(TreeEventKind::TreeCrud, move |event| {
            if let Some(data) = event.tree_data() {
                sizes_clone.lock().push(data.item_count());
            }
        });

        let first = {
            let tree = tree.clone();
            std::thread::spawn(move || tree.add_item(ItemDto::group("A"), None, -1))
        };
        entered_rx.recv().unwrap();
        assert!(!tree.is_notifying());

        assert!(tree.add_item(ItemDto::group("B"), None, -1).is_ok());
        assert!(first.join().unwrap().is_ok());
        assert_eq!(tree.len(), 2);
        assert_eq!(*sizes.lock(), [1, 2]);
    }
}
