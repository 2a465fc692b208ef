//! Settings document trait

use serde_json::Value;
use thiserror::Error;

/// Persistence tier for a settings write
///
/// The document stores tiers independently; tier precedence on read is the
/// caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsScope {
    /// User-wide settings
    Global,
    /// Settings for the current workspace only
    Workspace,
}

impl SettingsScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsScope::Global => "global",
            SettingsScope::Workspace => "workspace",
        }
    }
}

/// Errors that can occur reading or writing the settings document
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("settings error: {0}")]
    Other(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// An externally supplied key/value document
///
/// Reads see the union of tiers with workspace taking precedence over
/// global, matching how host configuration systems resolve values.
pub trait SettingsDocument: Send + Sync {
    /// Read the effective value for a key
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value into one tier; `None` removes the key from that tier
    fn update(&self, key: &str, value: Option<Value>, scope: SettingsScope) -> SettingsResult<()>;

    /// All keys present in any tier
    fn keys(&self) -> Vec<String>;
}
