//! The macro tree model: items, the tree that owns them, and its events.

mod action;
mod data;
mod debug;
mod event;
mod id;
mod item;
mod property;
mod tree;

pub use action::{
    Action, ActionData, Device, KeyState, KeyboardAction, KeyboardActionData, MouseAction,
    MouseActionData, NodeType, Point,
};
pub use data::TreeData;
pub use debug::{DisplayTree, TreeDebug, TreeFormatOptions, TreeStyle};
pub use event::{TreeEvent, TreeEventKind, TreeEventManager};
pub use id::{DUMMY_ROOT_ID, IdGenerator, ItemId, SequentialIdGenerator, UuidGenerator};
pub use item::{Item, ItemDomainData, ItemDto, ItemUIStateData};
pub use property::{PropertyKey, PropertyValue};
pub use tree::{Position, Tree};
