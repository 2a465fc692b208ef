//! JSON file-backed settings document
//!
//! Persists both tiers in one file:
//! `{ "global": { ... }, "workspace": { ... } }`.
//! Default location is `<config dir>/provkey/settings.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::traits::{SettingsDocument, SettingsError, SettingsResult, SettingsScope};

/// On-disk document structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    global: HashMap<String, Value>,
    #[serde(default)]
    workspace: HashMap<String, Value>,
}

/// JSON file-backed settings document
///
/// Reads go through a write-through cache; `reload()` picks up external
/// edits to the file.
pub struct JsonFileSettings {
    path: PathBuf,
    cache: RwLock<Option<SettingsFile>>,
}

impl JsonFileSettings {
    /// Create a settings document backed by a specific file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Settings document at the default user location
    /// (`<config dir>/provkey/settings.json`)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("provkey").join("settings.json"))
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the backing file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> SettingsResult<SettingsFile> {
        if !self.path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        let file: SettingsFile = serde_json::from_str(&content)?;
        Ok(file)
    }

    fn save(&self, file: &SettingsFile) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, content)?;

        let mut cache = self.cache.write();
        *cache = Some(file.clone());
        Ok(())
    }

    fn get_file(&self) -> SettingsResult<SettingsFile> {
        if let Some(file) = self.cache.read().as_ref() {
            return Ok(file.clone());
        }

        let file = self.load()?;
        let mut cache = self.cache.write();
        *cache = Some(file.clone());
        Ok(file)
    }

    /// Reload from disk, discarding the cache
    pub fn reload(&self) -> SettingsResult<()> {
        let file = self.load()?;
        let mut cache = self.cache.write();
        *cache = Some(file);
        Ok(())
    }
}

impl SettingsDocument for JsonFileSettings {
    fn get(&self, key: &str) -> Option<Value> {
        let file = self.get_file().ok()?;
        file.workspace
            .get(key)
            .or_else(|| file.global.get(key))
            .cloned()
    }

    fn update(&self, key: &str, value: Option<Value>, scope: SettingsScope) -> SettingsResult<()> {
        let mut file = self.get_file()?;
        let tier = match scope {
            SettingsScope::Global => &mut file.global,
            SettingsScope::Workspace => &mut file.workspace,
        };
        match value {
            Some(v) => {
                tier.insert(key.to_string(), v);
            }
            None => {
                if tier.remove(key).is_none() {
                    // Nothing to remove; skip the disk write
                    return Ok(());
                }
            }
        }
        self.save(&file)
    }

    fn keys(&self) -> Vec<String> {
        let Ok(file) = self.get_file() else {
            return Vec::new();
        };
        let mut keys: Vec<String> = file.global.keys().cloned().collect();
        for key in file.workspace.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

impl std::fmt::Debug for JsonFileSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileSettings")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}
