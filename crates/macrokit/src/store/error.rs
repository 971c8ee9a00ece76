//! Error types for persistence backends.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The kind of store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The backend could not be opened or reached.
    Connect,
    /// Reading or writing failed.
    Io,
    /// Stored data could not be decoded into a tree.
    Parse,
    /// No tree with the requested id exists.
    NotFound,
    /// The tree id cannot be used as a storage key.
    InvalidId,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::Connect => write!(f, "cannot open store"),
            StoreErrorKind::Io => write!(f, "store I/O error"),
            StoreErrorKind::Parse => write!(f, "cannot parse stored tree"),
            StoreErrorKind::NotFound => write!(f, "tree not found"),
            StoreErrorKind::InvalidId => write!(f, "invalid tree id"),
        }
    }
}

/// Error type for store operations.
#[derive(Debug)]
pub struct StoreError {
    kind: StoreErrorKind,
    tree_id: Option<String>,
    path: Option<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            tree_id: None,
            path: None,
            source: None,
        }
    }

    pub fn with_tree_id(mut self, tree_id: impl Into<String>) -> Self {
        self.tree_id = Some(tree_id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The directory or file could not be opened as a store.
    pub fn connect(path: &Path, err: io::Error) -> Self {
        Self::new(StoreErrorKind::Connect).with_path(path).with_source(err)
    }

    /// An I/O failure on `path`; a missing file maps to `NotFound`.
    pub fn io(path: &Path, err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => StoreErrorKind::NotFound,
            _ => StoreErrorKind::Io,
        };
        Self::new(kind).with_path(path).with_source(err)
    }

    pub fn parse(tree_id: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::new(StoreErrorKind::Parse)
            .with_tree_id(tree_id)
            .with_source(source)
    }

    pub fn not_found(tree_id: &str) -> Self {
        Self::new(StoreErrorKind::NotFound).with_tree_id(tree_id)
    }

    pub fn invalid_id(tree_id: &str) -> Self {
        Self::new(StoreErrorKind::InvalidId).with_tree_id(tree_id)
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn tree_id(&self) -> Option<&str> {
        self.tree_id.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(tree_id) = &self.tree_id {
            write!(f, " '{tree_id}'")?;
        }
        if let Some(path) = &self.path {
            write!(f, ": {}", path.display())?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
