//! Credential store implementations
//!
//! The store abstraction is a closed set of exactly two backends:
//! - `SettingsBackedStore`: encrypted entries in the persisted settings document
//! - `EnvironmentBackedStore`: process environment variables with a read cache

mod traits;
mod settings_store;
mod env_store;

pub use traits::{
    CredentialLookup, CredentialStore, StoreError, StoreResult, StoreValidation,
};
pub use settings_store::{SettingsBackedStore, CREDENTIAL_KEY_PREFIX};
pub use env_store::EnvironmentBackedStore;
