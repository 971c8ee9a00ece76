//! Configuration loaded from TOML.
//!
//! ```toml
//! [history]
//! max_history = 50
//!
//! [store]
//! directory = "./macros"
//! pretty = true
//!
//! [tree]
//! default_name = "Untitled"
//! ```
//!
//! Missing keys take their defaults and unknown keys are ignored.

use std::io;
use std::path::{Path, PathBuf};

use macrokit_core::logging::targets;
use serde::{Deserialize, Serialize};

use crate::history::{DEFAULT_MAX_HISTORY, StateManager};
use crate::store::{JsonFileStore, StoreResult, write_atomic};

/// Result type alias for settings operations.
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Errors reading or writing a settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot access settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Snapshots kept on each of the undo and redo stacks.
    pub max_history: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory the JSON store keeps its files in.
    pub directory: PathBuf,
    /// Pretty-print stored JSON.
    pub pretty: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./macros"),
            pretty: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Name given to new trees.
    pub default_name: String,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            default_name: "Untitled".to_string(),
        }
    }
}

/// All macrokit settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub history: HistorySettings,
    pub store: StoreSettings,
    pub tree: TreeSettings,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let settings = Self::from_toml_str(&text)?;
                tracing::debug!(target: targets::SETTINGS, path = %path.display(), "settings loaded");
                Ok(settings)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    target: targets::SETTINGS,
                    path = %path.display(),
                    "no settings file, using defaults"
                );
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the settings to `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        write_atomic(path, text.as_bytes()).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "settings saved");
        Ok(())
    }

    /// A history bounded by `history.max_history`.
    pub fn state_manager(&self) -> StateManager {
        StateManager::new(self.history.max_history)
    }

    /// Opens the JSON store configured under `[store]`.
    pub fn open_store(&self) -> StoreResult<JsonFileStore> {
        Ok(JsonFileStore::open(&self.store.directory)?.with_pretty(self.store.pretty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.history.max_history, 100);
        assert_eq!(settings.store.directory, PathBuf::from("./macros"));
        assert!(settings.store.pretty);
        assert_eq!(settings.tree.default_name, "Untitled");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            unknown_top = 1

            [history]
            max_history = 3
            "#,
        )
        .unwrap();
        assert_eq!(settings.history.max_history, 3);
        assert_eq!(settings.tree.default_name, "Untitled");
        assert_eq!(settings.state_manager().max_history(), 3);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Settings::from_toml_str("[history]\nmax_history = \"many\"").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macrokit.toml");
        let mut settings = Settings::default();
        settings.tree.default_name = "Scratch".to_string();
        settings.store.directory = dir.path().join("trees");
        settings.store.pretty = false;

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);

        let store = loaded.open_store().unwrap();
        assert_eq!(store.directory(), dir.path().join("trees"));
    }
}
