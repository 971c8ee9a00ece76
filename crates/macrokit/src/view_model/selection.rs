//! The set of selected items.

use std::collections::HashSet;

use crate::model::ItemId;

/// Selected ids, kept in the order they were selected.
///
/// Mutators return what actually changed so the caller can announce it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<ItemId>,
    order: Vec<ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Selected ids in selection order.
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Returns `true` if the id was not selected before.
    pub fn insert(&mut self, id: ItemId) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Returns `true` if the id was selected.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.order.retain(|selected| selected != id);
        true
    }

    /// Replaces the selection; returns (newly selected, deselected).
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ItemId>) -> (Vec<ItemId>, Vec<ItemId>) {
        let mut next = Selection::new();
        for id in ids {
            next.insert(id);
        }
        let selected = next
            .order
            .iter()
            .filter(|id| !self.ids.contains(*id))
            .cloned()
            .collect();
        let deselected = self
            .order
            .iter()
            .filter(|id| !next.ids.contains(*id))
            .cloned()
            .collect();
        *self = next;
        (selected, deselected)
    }

    /// Deselects everything; returns what was selected.
    pub fn clear(&mut self) -> Vec<ItemId> {
        self.ids.clear();
        std::mem::take(&mut self.order)
    }

    /// Keeps only ids for which `keep` holds; returns the ones dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&ItemId) -> bool) -> Vec<ItemId> {
        let mut dropped = Vec::new();
        self.order.retain(|id| {
            if keep(id) {
                true
            } else {
                dropped.push(id.clone());
                false
            }
        });
        for id in &dropped {
            self.ids.remove(id);
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ItemId {
        ItemId::new(s)
    }

    #[test]
    fn test_insert_remove() {
        let mut selection = Selection::new();
        assert!(selection.insert(id("a")));
        assert!(!selection.insert(id("a")));
        assert!(selection.insert(id("b")));
        assert_eq!(selection.ids(), [id("a"), id("b")]);

        assert!(selection.remove(&id("a")));
        assert!(!selection.remove(&id("a")));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_replace_reports_diff() {
        let mut selection = Selection::new();
        selection.insert(id("a"));
        selection.insert(id("b"));

        let (selected, deselected) = selection.replace([id("b"), id("c"), id("c")]);
        assert_eq!(selected, [id("c")]);
        assert_eq!(deselected, [id("a")]);
        assert_eq!(selection.ids(), [id("b"), id("c")]);
    }

    #[test]
    fn test_retain_and_clear() {
        let mut selection = Selection::new();
        for s in ["a", "b", "c"] {
            selection.insert(id(s));
        }
        let dropped = selection.retain(|i| i.as_str() != "b");
        assert_eq!(dropped, [id("b")]);
        assert!(!selection.contains(&id("b")));

        assert_eq!(selection.clear(), [id("a"), id("c")]);
        assert!(selection.is_empty());
    }
}
