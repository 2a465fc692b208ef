//! Persisted settings document abstraction
//!
//! The settings-backed credential store treats an externally supplied
//! key/value document as its sole persistence substrate. Implementations:
//! - `MemorySettingsDocument`: In-memory for testing
//! - `JsonFileSettings`: JSON file on disk
//! - Host adapter: an editor's configuration API or similar

mod traits;
mod memory;
mod file;

pub use traits::{SettingsDocument, SettingsError, SettingsResult, SettingsScope};
pub use memory::MemorySettingsDocument;
pub use file::JsonFileSettings;
