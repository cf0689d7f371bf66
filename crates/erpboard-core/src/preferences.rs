//! User preferences and their JSON store
//!
//! Only this part of the application state survives a restart.

use erpboard_config::{ExportFormat, PreferencesConfig, PREFERENCES_STORE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::filters::Filters;

const STORE_VERSION: u32 = 1;

/// Color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::System
    }
}

/// Persisted UI preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub filters: Filters,
    pub theme: Theme,
    pub export_format: ExportFormat,
}

/// On-disk envelope
#[derive(Debug, Serialize, Deserialize)]
struct StoredPreferences {
    name: String,
    version: u32,
    state: Preferences,
}

/// JSON file holding [`Preferences`]
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &PreferencesConfig) -> Self {
        Self::new(config.path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved preferences. A missing file yields the defaults; an
    /// unreadable one is logged and ignored.
    pub fn load(&self) -> Preferences {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    target: "erpboard::preferences",
                    "No saved preferences at {}",
                    self.path.display()
                );
                return Preferences::default();
            }
            Err(e) => {
                log::warn!(
                    target: "erpboard::preferences",
                    "Cannot read {}: {}",
                    self.path.display(),
                    e
                );
                return Preferences::default();
            }
        };

        match serde_json::from_str::<StoredPreferences>(&content) {
            Ok(stored) if stored.name == PREFERENCES_STORE_NAME => {
                if stored.version != STORE_VERSION {
                    log::info!(
                        target: "erpboard::preferences",
                        "Migrating preferences from version {}",
                        stored.version
                    );
                }
                stored.state
            }
            Ok(stored) => {
                log::warn!(
                    target: "erpboard::preferences",
                    "Ignoring {}: store name is '{}'",
                    self.path.display(),
                    stored.name
                );
                Preferences::default()
            }
            Err(e) => {
                log::warn!(
                    target: "erpboard::preferences",
                    "Ignoring corrupt preferences in {}: {}",
                    self.path.display(),
                    e
                );
                Preferences::default()
            }
        }
    }

    /// Write preferences, replacing the file atomically
    pub fn save(&self, preferences: &Preferences) -> CoreResult<()> {
        let stored = StoredPreferences {
            name: PREFERENCES_STORE_NAME.to_string(),
            version: STORE_VERSION,
            state: preferences.clone(),
        };
        let content = serde_json::to_string_pretty(&stored).map_err(|e| self.error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| self.error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;

        log::debug!(target: "erpboard::preferences", "Saved preferences to {}", self.path.display());
        Ok(())
    }

    fn error(&self, e: impl std::fmt::Display) -> CoreError {
        CoreError::Persistence {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}
