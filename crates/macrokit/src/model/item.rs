//! A single node of the macro tree.

use serde::{Deserialize, Serialize};

use crate::error::TreeResult;

use super::action::{Action, ActionData, Device, NodeType};
use super::id::ItemId;

/// The persistent part of an item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDomainData {
    pub name: String,
    pub parent_id: Option<ItemId>,
    /// Child ids in display order.
    pub children_ids: Vec<ItemId>,
    pub node_type: Option<NodeType>,
    pub device: Option<Device>,
    pub action: Option<Action>,
    pub action_data: Option<ActionData>,
}

/// Presentation state of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemUIStateData {
    pub is_selected: bool,
    pub is_expanded: bool,
    /// Hidden items are skipped when the tree is replayed.
    pub visible: bool,
    pub icon: String,
}

impl Default for ItemUIStateData {
    fn default() -> Self {
        Self {
            is_selected: false,
            is_expanded: false,
            visible: true,
            icon: String::new(),
        }
    }
}

/// One node of a tree: its id, domain data and UI state.
///
/// Serialized as `{ "id", "data", "ui_state" }`; `"domain_data"` is accepted
/// in place of `"data"` when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    #[serde(rename = "data", alias = "domain_data")]
    domain: ItemDomainData,
    #[serde(rename = "ui_state", default)]
    ui: ItemUIStateData,
}

impl Item {
    pub fn new(id: ItemId, domain: ItemDomainData, ui: ItemUIStateData) -> Self {
        Self { id, domain, ui }
    }

    /// Builds an item with the given id from a DTO.
    pub fn from_dto(id: ItemId, dto: ItemDto) -> Self {
        Self {
            id,
            domain: dto.domain,
            ui: dto.ui,
        }
    }

    /// The sentinel root every tree owns.
    pub fn dummy_root() -> Self {
        Self {
            id: ItemId::dummy_root(),
            domain: ItemDomainData {
                name: "root".to_string(),
                node_type: Some(NodeType::Group),
                ..Default::default()
            },
            ui: ItemUIStateData {
                is_expanded: true,
                ..Default::default()
            },
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn domain(&self) -> &ItemDomainData {
        &self.domain
    }

    pub fn ui(&self) -> &ItemUIStateData {
        &self.ui
    }

    /// Replaces the domain data.
    pub fn set_domain(&mut self, domain: ItemDomainData) {
        self.domain = domain;
    }

    /// Replaces the UI state.
    pub fn set_ui(&mut self, ui: ItemUIStateData) {
        self.ui = ui;
    }

    pub(crate) fn domain_mut(&mut self) -> &mut ItemDomainData {
        &mut self.domain
    }

    pub(crate) fn ui_mut(&mut self) -> &mut ItemUIStateData {
        &mut self.ui
    }

    pub fn name(&self) -> &str {
        &self.domain.name
    }

    pub fn node_type(&self) -> Option<NodeType> {
        self.domain.node_type
    }

    pub fn is_group(&self) -> bool {
        self.domain.node_type == Some(NodeType::Group)
    }

    pub fn is_instruction(&self) -> bool {
        self.domain.node_type == Some(NodeType::Instruction)
    }

    pub fn parent_id(&self) -> Option<&ItemId> {
        self.domain.parent_id.as_ref()
    }

    pub fn children_ids(&self) -> &[ItemId] {
        &self.domain.children_ids
    }

    pub fn is_visible(&self) -> bool {
        self.ui.visible
    }

    /// Copies the domain and UI data into a DTO.
    pub fn to_dto(&self) -> ItemDto {
        ItemDto {
            domain: self.domain.clone(),
            ui: self.ui.clone(),
        }
    }

    /// Converts the item to its dictionary form.
    pub fn to_dict(&self) -> TreeResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reads an item from its dictionary form.
    pub fn from_dict(value: &serde_json::Value) -> TreeResult<Self> {
        Ok(Self::deserialize(value)?)
    }
}

/// The data needed to create or overwrite an item, without its id.
///
/// ```
/// use macrokit::model::{ItemDto, MouseAction};
///
/// let dto = ItemDto::instruction("Open menu").with_action(MouseAction::RightClick);
/// assert_eq!(dto.domain.name, "Open menu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDto {
    #[serde(rename = "data", alias = "domain_data")]
    pub domain: ItemDomainData,
    #[serde(rename = "ui_state")]
    pub ui: ItemUIStateData,
}

impl ItemDto {
    pub fn new(name: impl Into<String>, node_type: Option<NodeType>) -> Self {
        Self {
            domain: ItemDomainData {
                name: name.into(),
                node_type,
                ..Default::default()
            },
            ui: ItemUIStateData::default(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, Some(NodeType::Group))
    }

    pub fn instruction(name: impl Into<String>) -> Self {
        Self::new(name, Some(NodeType::Instruction))
    }

    /// Sets the action and the device it implies.
    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        let action = action.into();
        self.domain.device = Some(action.device());
        self.domain.action = Some(action);
        self
    }

    /// Sets the action parameters together with the action and device they imply.
    pub fn with_action_data(mut self, data: ActionData) -> Self {
        self.domain.action = Some(data.action());
        self.domain.device = Some(data.device());
        self.domain.action_data = Some(data);
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.domain.device = Some(device);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.ui.icon = icon.into();
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.ui.is_expanded = expanded;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.ui.visible = visible;
        self
    }
}

impl From<&Item> for ItemDto {
    fn from(item: &Item) -> Self {
        item.to_dto()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeyboardAction, MouseAction, Point};

    #[test]
    fn test_ui_state_defaults() {
        let ui = ItemUIStateData::default();
        assert!(ui.visible);
        assert!(!ui.is_selected);
        assert!(!ui.is_expanded);
        assert!(ui.icon.is_empty());
    }

    #[test]
    fn test_dto_builders_infer_device() {
        let dto = ItemDto::instruction("copy").with_action(KeyboardAction::Shortcut);
        assert_eq!(dto.domain.device, Some(Device::Keyboard));
        assert_eq!(dto.domain.action, Some(Action::Keyboard(KeyboardAction::Shortcut)));

        let dto = ItemDto::instruction("click").with_action_data(ActionData::click(Point::new(3, 4)));
        assert_eq!(dto.domain.device, Some(Device::Mouse));
        assert_eq!(dto.domain.action, Some(Action::Mouse(MouseAction::Click)));
        assert!(dto.domain.action_data.is_some());
    }

    #[test]
    fn test_dict_uses_canonical_keys() {
        let item = Item::from_dto(ItemId::new("a"), ItemDto::group("A").with_icon("folder"));
        let dict = item.to_dict().unwrap();

        assert_eq!(dict["id"], "a");
        assert_eq!(dict["data"]["name"], "A");
        assert_eq!(dict["data"]["node_type"], "group");
        assert_eq!(dict["data"]["parent_id"], serde_json::Value::Null);
        assert_eq!(dict["ui_state"]["icon"], "folder");
        assert_eq!(dict["ui_state"]["visible"], true);

        assert_eq!(Item::from_dict(&dict).unwrap(), item);
    }

    #[test]
    fn test_from_dict_accepts_domain_data_key() {
        let dict = serde_json::json!({
            "id": "x",
            "domain_data": { "name": "X", "node_type": "instruction", "action": "type" },
        });
        let item = Item::from_dict(&dict).unwrap();
        assert_eq!(item.name(), "X");
        assert!(item.is_instruction());
        assert_eq!(item.domain().action, Some(Action::Keyboard(KeyboardAction::Type)));
        assert!(item.is_visible());
    }

    #[test]
    fn test_from_dict_rejects_garbage() {
        let dict = serde_json::json!({ "id": 5 });
        assert!(Item::from_dict(&dict).is_err());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Item::from_dto(ItemId::new("a"), ItemDto::group("A"));
        let mut copy = original.clone();
        copy.domain_mut().name = "B".to_string();
        copy.ui_mut().is_expanded = true;

        assert_eq!(original.name(), "A");
        assert!(!original.ui().is_expanded);
    }

    #[test]
    fn test_dummy_root_shape() {
        let root = Item::dummy_root();
        assert!(root.id().is_dummy_root());
        assert!(root.is_group());
        assert!(root.parent_id().is_none());
        assert!(root.children_ids().is_empty());
    }
}
