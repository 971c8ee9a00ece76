//! String-keyed access to item fields.
//!
//! Keys name a field of either [`ItemDomainData`](super::ItemDomainData) or
//! [`ItemUIStateData`](super::ItemUIStateData). The set of keys is closed:
//! anything else is an [`UnknownProperty`](TreeError::UnknownProperty).

use std::fmt;
use std::str::FromStr;

use crate::error::{TreeError, TreeResult};

use super::action::{Action, ActionData, Device, NodeType};
use super::id::ItemId;
use super::item::Item;

/// A field of an item, addressable by its serialized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name,
    ParentId,
    ChildrenIds,
    NodeType,
    Device,
    Action,
    ActionData,
    IsSelected,
    IsExpanded,
    Visible,
    Icon,
}

impl PropertyKey {
    /// Every key, domain keys first.
    pub const ALL: [PropertyKey; 11] = [
        PropertyKey::Name,
        PropertyKey::ParentId,
        PropertyKey::ChildrenIds,
        PropertyKey::NodeType,
        PropertyKey::Device,
        PropertyKey::Action,
        PropertyKey::ActionData,
        PropertyKey::IsSelected,
        PropertyKey::IsExpanded,
        PropertyKey::Visible,
        PropertyKey::Icon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::Name => "name",
            PropertyKey::ParentId => "parent_id",
            PropertyKey::ChildrenIds => "children_ids",
            PropertyKey::NodeType => "node_type",
            PropertyKey::Device => "device",
            PropertyKey::Action => "action",
            PropertyKey::ActionData => "action_data",
            PropertyKey::IsSelected => "is_selected",
            PropertyKey::IsExpanded => "is_expanded",
            PropertyKey::Visible => "visible",
            PropertyKey::Icon => "icon",
        }
    }

    /// Whether the key belongs to the UI state rather than the domain data.
    pub fn is_ui(&self) -> bool {
        matches!(
            self,
            PropertyKey::IsSelected | PropertyKey::IsExpanded | PropertyKey::Visible | PropertyKey::Icon
        )
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyKey {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| TreeError::UnknownProperty(s.to_string()))
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Bool(bool),
    Id(Option<ItemId>),
    Ids(Vec<ItemId>),
    NodeType(Option<NodeType>),
    Device(Option<Device>),
    Action(Option<Action>),
    ActionData(Option<ActionData>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl Item {
    /// Reads one field.
    pub fn property(&self, key: PropertyKey) -> PropertyValue {
        let domain = self.domain();
        let ui = self.ui();
        match key {
            PropertyKey::Name => PropertyValue::Text(domain.name.clone()),
            PropertyKey::ParentId => PropertyValue::Id(domain.parent_id.clone()),
            PropertyKey::ChildrenIds => PropertyValue::Ids(domain.children_ids.clone()),
            PropertyKey::NodeType => PropertyValue::NodeType(domain.node_type),
            PropertyKey::Device => PropertyValue::Device(domain.device),
            PropertyKey::Action => PropertyValue::Action(domain.action),
            PropertyKey::ActionData => PropertyValue::ActionData(domain.action_data.clone()),
            PropertyKey::IsSelected => PropertyValue::Bool(ui.is_selected),
            PropertyKey::IsExpanded => PropertyValue::Bool(ui.is_expanded),
            PropertyKey::Visible => PropertyValue::Bool(ui.visible),
            PropertyKey::Icon => PropertyValue::Text(ui.icon.clone()),
        }
    }

    /// Reads a field by name, returning `default` for unknown keys.
    pub fn get_property(&self, key: &str, default: PropertyValue) -> PropertyValue {
        match key.parse::<PropertyKey>() {
            Ok(key) => self.property(key),
            Err(_) => default,
        }
    }

    /// Writes a field by name.
    ///
    /// Fails with `UnknownProperty` for keys outside the closed set and with
    /// `TypeMismatch` when the value has the wrong variant; the item is left
    /// unchanged in both cases.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) -> TreeResult<()> {
        let key: PropertyKey = key.parse()?;
        let mismatch = |expected| Err(TreeError::type_mismatch(key.as_str(), expected));

        match (key, value) {
            (PropertyKey::Name, PropertyValue::Text(name)) => self.domain_mut().name = name,
            (PropertyKey::Name, _) => return mismatch("text"),
            (PropertyKey::ParentId, PropertyValue::Id(id)) => self.domain_mut().parent_id = id,
            (PropertyKey::ParentId, _) => return mismatch("an optional item id"),
            (PropertyKey::ChildrenIds, PropertyValue::Ids(ids)) => self.domain_mut().children_ids = ids,
            (PropertyKey::ChildrenIds, _) => return mismatch("a list of item ids"),
            (PropertyKey::NodeType, PropertyValue::NodeType(t)) => self.domain_mut().node_type = t,
            (PropertyKey::NodeType, _) => return mismatch("an optional node type"),
            (PropertyKey::Device, PropertyValue::Device(d)) => self.domain_mut().device = d,
            (PropertyKey::Device, _) => return mismatch("an optional device"),
            (PropertyKey::Action, PropertyValue::Action(a)) => self.domain_mut().action = a,
            (PropertyKey::Action, _) => return mismatch("an optional action"),
            (PropertyKey::ActionData, PropertyValue::ActionData(d)) => {
                self.domain_mut().action_data = d
            }
            (PropertyKey::ActionData, _) => return mismatch("optional action data"),
            (PropertyKey::IsSelected, PropertyValue::Bool(b)) => self.ui_mut().is_selected = b,
            (PropertyKey::IsExpanded, PropertyValue::Bool(b)) => self.ui_mut().is_expanded = b,
            (PropertyKey::Visible, PropertyValue::Bool(b)) => self.ui_mut().visible = b,
            (PropertyKey::IsSelected | PropertyKey::IsExpanded | PropertyKey::Visible, _) => {
                return mismatch("a bool");
            }
            (PropertyKey::Icon, PropertyValue::Text(icon)) => self.ui_mut().icon = icon,
            (PropertyKey::Icon, _) => return mismatch("text"),
        }
        Ok(())
    }
}
