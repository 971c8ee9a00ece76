//! The serialized form of a tree.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

use super::action::NodeType;
use super::id::ItemId;
use super::item::Item;

/// A full, independently owned snapshot of a tree.
///
/// This is the dictionary form trees serialize to, the payload of snapshot
/// events, and the unit the undo history stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeData {
    pub id: String,
    pub name: String,
    pub root_id: ItemId,
    pub items: BTreeMap<ItemId, Item>,
}

impl TreeData {
    /// A snapshot holding only the dummy root.
    pub fn empty(id: impl Into<String>, name: impl Into<String>) -> Self {
        let root = Item::dummy_root();
        let mut items = BTreeMap::new();
        items.insert(root.id().clone(), root);
        Self {
            id: id.into(),
            name: name.into(),
            root_id: ItemId::dummy_root(),
            items,
        }
    }

    /// Number of items, the dummy root excluded.
    pub fn item_count(&self) -> usize {
        self.items.len().saturating_sub(1)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn to_json(&self) -> TreeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> TreeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the structural invariants and returns the first violation.
    ///
    /// - the root is the dummy root, is a group, and has no parent;
    /// - every map key equals the id stored in its item;
    /// - every other item has a parent that exists and lists it as a child;
    /// - every listed child exists and points back at the listing parent;
    /// - no child list holds an id twice;
    /// - following parents from any item reaches the root.
    pub fn validate(&self) -> TreeResult<()> {
        if !self.root_id.is_dummy_root() {
            return Err(TreeError::invalid_payload(format!(
                "root id '{}' is not the dummy root",
                self.root_id
            )));
        }
        let root = self
            .items
            .get(&self.root_id)
            .ok_or_else(|| TreeError::invalid_payload("dummy root is missing"))?;
        if root.parent_id().is_some() {
            return Err(TreeError::invalid_payload("dummy root has a parent"));
        }
        if root.node_type() != Some(NodeType::Group) {
            return Err(TreeError::invalid_payload("dummy root is not a group"));
        }

        for (key, item) in &self.items {
            if key != item.id() {
                return Err(TreeError::invalid_payload(format!(
                    "item stored under '{key}' has id '{}'",
                    item.id()
                )));
            }

            let mut seen = HashSet::new();
            for child_id in item.children_ids() {
                if !seen.insert(child_id) {
                    return Err(TreeError::DuplicateId(child_id.clone()));
                }
                let child = self.items.get(child_id).ok_or_else(|| {
                    TreeError::invalid_payload(format!("'{key}' lists unknown child '{child_id}'"))
                })?;
                if child.parent_id() != Some(key) {
                    return Err(TreeError::invalid_payload(format!(
                        "'{child_id}' is listed under '{key}' but does not point back at it"
                    )));
                }
            }

            if key == &self.root_id {
                continue;
            }
            let parent_id = item.parent_id().ok_or_else(|| {
                TreeError::invalid_payload(format!("'{key}' has no parent"))
            })?;
            let parent = self.items.get(parent_id).ok_or_else(|| {
                TreeError::invalid_payload(format!("'{key}' has unknown parent '{parent_id}'"))
            })?;
            if !parent.children_ids().contains(key) {
                return Err(TreeError::invalid_payload(format!(
                    "'{parent_id}' does not list its child '{key}'"
                )));
            }
        }

        for id in self.items.keys() {
            let mut current = id;
            let mut steps = 0;
            while current != &self.root_id {
                steps += 1;
                if steps > self.items.len() {
                    return Err(TreeError::invalid_payload(format!(
                        "'{id}' is part of a cycle"
                    )));
                }
                current = match self.items.get(current).and_then(Item::parent_id) {
                    Some(parent) => parent,
                    None => break,
                };
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemDto;

    fn with_child(data: &mut TreeData, id: &str, parent: &ItemId) {
        let id = ItemId::new(id);
        let mut item = Item::from_dto(id.clone(), ItemDto::group(id.as_str()));
        item.domain_mut().parent_id = Some(parent.clone());
        data.items.insert(id.clone(), item);
        if let Some(parent) = data.items.get_mut(parent) {
            parent.domain_mut().children_ids.push(id);
        }
    }

    #[test]
    fn test_empty_is_valid() {
        let data = TreeData::empty("t", "T");
        assert!(data.validate().is_ok());
        assert_eq!(data.item_count(), 0);
    }

    #[test]
    fn test_missing_root() {
        let mut data = TreeData::empty("t", "T");
        data.items.clear();
        assert!(matches!(data.validate(), Err(TreeError::InvalidPayload(_))));
    }

    #[test]
    fn test_duplicate_child() {
        let mut data = TreeData::empty("t", "T");
        let root = ItemId::dummy_root();
        with_child(&mut data, "a", &root);
        if let Some(root_item) = data.items.get_mut(&root) {
            root_item.domain_mut().children_ids.push(ItemId::new("a"));
        }
        assert!(matches!(data.validate(), Err(TreeError::DuplicateId(id)) if id.as_str() == "a"));
    }

    #[test]
    fn test_incoherent_parent() {
        let mut data = TreeData::empty("t", "T");
        let root = ItemId::dummy_root();
        with_child(&mut data, "a", &root);
        with_child(&mut data, "b", &root);
        if let Some(b) = data.items.get_mut(&ItemId::new("b")) {
            b.domain_mut().parent_id = Some(ItemId::new("a"));
        }
        assert!(matches!(data.validate(), Err(TreeError::InvalidPayload(_))));
    }

    #[test]
    fn test_cycle_detected() {
        let mut data = TreeData::empty("t", "T");
        let a = ItemId::new("a");
        let b = ItemId::new("b");
        with_child(&mut data, "a", &b);
        with_child(&mut data, "b", &a);
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut data = TreeData::empty("t", "T");
        with_child(&mut data, "a", &ItemId::dummy_root());
        let json = data.to_json().unwrap();
        assert!(json.contains("\n  \"id\": \"t\""));
        assert_eq!(TreeData::from_json(&json).unwrap(), data);
    }
}
