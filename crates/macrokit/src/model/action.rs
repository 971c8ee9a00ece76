//! Node kinds, input devices and the actions an instruction replays.

use serde::{Deserialize, Serialize};

/// What an item is: a container or a replayable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Container; may hold children.
    Group,
    /// Leaf carrying an action.
    Instruction,
}

/// Input device an instruction drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Mouse,
    Keyboard,
    Joystick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseAction {
    Click,
    DoubleClick,
    RightClick,
    Drag,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardAction {
    Type,
    Shortcut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    Pressed,
    Released,
}

/// A screen position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The action of an instruction, for either device family.
///
/// Serialized as the bare snake_case action name (`"click"`, `"shortcut"`);
/// the names of the two families never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Mouse(MouseAction),
    Keyboard(KeyboardAction),
}

impl Action {
    /// The device family this action belongs to.
    pub fn device(&self) -> Device {
        match self {
            Action::Mouse(_) => Device::Mouse,
            Action::Keyboard(_) => Device::Keyboard,
        }
    }
}

impl From<MouseAction> for Action {
    fn from(action: MouseAction) -> Self {
        Action::Mouse(action)
    }
}

impl From<KeyboardAction> for Action {
    fn from(action: KeyboardAction) -> Self {
        Action::Keyboard(action)
    }
}

/// Parameters of a mouse action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseActionData {
    pub action: MouseAction,
    pub position: Point,
    /// Drop point for drags; `None` otherwise.
    #[serde(default)]
    pub end_position: Option<Point>,
    #[serde(default = "default_button")]
    pub button: String,
}

fn default_button() -> String {
    "left".to_string()
}

/// Parameters of a keyboard action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardActionData {
    pub action: KeyboardAction,
    /// Keys in replay order, each with the transition to perform.
    #[serde(default)]
    pub key_sequence: Vec<(String, KeyState)>,
}

impl KeyboardActionData {
    /// A press/release pair for every character of `text`.
    pub fn typing(text: &str) -> Self {
        let key_sequence = text
            .chars()
            .flat_map(|c| {
                let key = c.to_string();
                [(key.clone(), KeyState::Pressed), (key, KeyState::Released)]
            })
            .collect();
        Self {
            action: KeyboardAction::Type,
            key_sequence,
        }
    }

    /// Presses `keys` in order, then releases them in reverse.
    pub fn shortcut<S: AsRef<str>>(keys: &[S]) -> Self {
        let pressed = keys
            .iter()
            .map(|k| (k.as_ref().to_string(), KeyState::Pressed));
        let released = keys
            .iter()
            .rev()
            .map(|k| (k.as_ref().to_string(), KeyState::Released));
        Self {
            action: KeyboardAction::Shortcut,
            key_sequence: pressed.chain(released).collect(),
        }
    }
}

/// Device-specific parameters of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionData {
    Mouse(MouseActionData),
    Keyboard(KeyboardActionData),
}

impl ActionData {
    /// A left click at `position`.
    pub fn click(position: Point) -> Self {
        ActionData::Mouse(MouseActionData {
            action: MouseAction::Click,
            position,
            end_position: None,
            button: default_button(),
        })
    }

    /// A left-button drag from `from` to `to`.
    pub fn drag(from: Point, to: Point) -> Self {
        ActionData::Mouse(MouseActionData {
            action: MouseAction::Drag,
            position: from,
            end_position: Some(to),
            button: default_button(),
        })
    }

    /// The action these parameters belong to.
    pub fn action(&self) -> Action {
        match self {
            ActionData::Mouse(data) => Action::Mouse(data.action),
            ActionData::Keyboard(data) => Action::Keyboard(data.action),
        }
    }

    pub fn device(&self) -> Device {
        self.action().device()
    }
}
