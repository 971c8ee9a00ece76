//! Error types for tree operations.

use crate::model::ItemId;

/// Result type alias for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Errors returned by [`Tree`](crate::model::Tree) and [`Item`](crate::model::Item).
///
/// A failed operation leaves the tree unchanged and emits no events.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// No item with this id exists.
    #[error("item '{0}' not found")]
    ItemNotFound(ItemId),

    /// The requested parent does not exist.
    #[error("parent '{0}' not found")]
    ParentNotFound(ItemId),

    /// The dummy root is permanent.
    #[error("the dummy root cannot be removed")]
    CannotRemoveDummyRoot,

    /// The dummy root is always the top of the tree.
    #[error("the dummy root cannot be moved")]
    CannotMoveDummyRoot,

    /// The dummy root carries no user data.
    #[error("the dummy root cannot be modified")]
    CannotModifyDummyRoot,

    /// The move would place an item beneath itself.
    #[error("moving '{item_id}' under '{new_parent_id}' would create a cycle")]
    CycleDetected { item_id: ItemId, new_parent_id: ItemId },

    /// An id occurs twice where it must be unique.
    #[error("duplicate item id '{0}'")]
    DuplicateId(ItemId),

    /// A snapshot or dictionary does not describe a valid tree.
    #[error("invalid tree payload: {0}")]
    InvalidPayload(String),

    /// A property setter received a value of the wrong type.
    #[error("property '{key}' expects {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// The property key is not part of the item's domain or UI state.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    /// A subscriber tried to mutate the tree while being notified by it.
    #[error("the tree cannot be mutated from inside one of its own event callbacks")]
    ReentrantMutation,

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TreeError {
    /// Create an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(key: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected,
        }
    }
}
