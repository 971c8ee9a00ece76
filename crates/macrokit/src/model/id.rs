//! Item identifiers and id generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// The fixed id of the sentinel root every tree owns.
pub const DUMMY_ROOT_ID: &str = "__dummy_root__";

/// Opaque identifier of one item in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id of the dummy root.
    pub fn dummy_root() -> Self {
        Self(DUMMY_ROOT_ID.to_string())
    }

    /// Whether this is the dummy root id.
    pub fn is_dummy_root(&self) -> bool {
        self.0 == DUMMY_ROOT_ID
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh item ids.
///
/// Trees use [`UuidGenerator`] unless another generator is injected; tests
/// inject [`SequentialIdGenerator`] to get predictable ids.
pub trait IdGenerator: Send + Sync {
    /// Produces an id that has not been handed out before.
    fn next_id(&self) -> ItemId;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> ItemId {
        ItemId(uuid::Uuid::new_v4().to_string())
    }
}

/// Deterministic ids of the form `<prefix>-<n>`, starting at 1.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator producing `<prefix>-1`, `<prefix>-2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("item")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> ItemId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        ItemId(format!("{}-{}", self.prefix, n))
    }
}
