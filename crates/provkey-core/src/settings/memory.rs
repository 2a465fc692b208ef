//! In-memory settings document

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::traits::{SettingsDocument, SettingsResult, SettingsScope};

/// In-memory settings document for testing
#[derive(Debug, Default)]
pub struct MemorySettingsDocument {
    global: RwLock<HashMap<String, Value>>,
    workspace: RwLock<HashMap<String, Value>>,
}

impl MemorySettingsDocument {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value from one tier only (useful for scope assertions)
    pub fn get_scoped(&self, key: &str, scope: SettingsScope) -> Option<Value> {
        match scope {
            SettingsScope::Global => self.global.read().get(key).cloned(),
            SettingsScope::Workspace => self.workspace.read().get(key).cloned(),
        }
    }

    /// Clear both tiers
    pub fn clear(&self) {
        self.global.write().clear();
        self.workspace.write().clear();
    }
}

impl SettingsDocument for MemorySettingsDocument {
    fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.workspace.read().get(key) {
            return Some(value.clone());
        }
        self.global.read().get(key).cloned()
    }

    fn update(&self, key: &str, value: Option<Value>, scope: SettingsScope) -> SettingsResult<()> {
        let mut tier = match scope {
            SettingsScope::Global => self.global.write(),
            SettingsScope::Workspace => self.workspace.write(),
        };
        match value {
            Some(v) => {
                tier.insert(key.to_string(), v);
            }
            None => {
                tier.remove(key);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.global.read().keys().cloned().collect();
        for key in self.workspace.read().keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}
