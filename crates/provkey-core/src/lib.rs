//! ProvKey Core
//!
//! Storage abstraction and migration engine for AI provider API
//! credentials. This crate provides the core functionality that can be
//! embedded from any environment (desktop app, native CLI, service).
//!
//! ## Stores and routing
//!
//! Credentials live in one of two stores: an encrypted settings document
//! or environment variables. The `StrategyRouter` picks the owning store
//! per provider, so callers never hard-code where a credential lives.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use provkey_core::context::CredentialContext;
//! use provkey_core::crypto::SecretCipher;
//! use provkey_core::settings::{JsonFileSettings, SettingsScope};
//! use provkey_core::types::provider_by_id;
//!
//! let ctx = CredentialContext::builder(
//!     Arc::new(JsonFileSettings::user()?),
//!     SecretCipher::from_key(key),
//! )
//! .build();
//!
//! let anthropic = provider_by_id("anthropic").unwrap();
//! ctx.router().set_credential(anthropic, secret, SettingsScope::Global)?;
//! ```
//!
//! ## Migration
//!
//! The `migration` module moves a provider's credential between stores
//! with a backup-first state machine: detect, backup, transfer, verify,
//! cleanup. Failures are reported as structured outcomes, never raised.

pub mod acquisition;
pub mod context;
pub mod crypto;
pub mod environment;
pub mod logging;
pub mod migration;
pub mod router;
pub mod settings;
pub mod stores;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use context::{CredentialContext, CredentialContextBuilder};

pub use types::{
    provider_by_id, registered_providers, CredentialRecord, EnvVarSpec, Provider, StorageMethod,
    ValidationStatus,
};

pub use stores::{
    CredentialLookup, CredentialStore, EnvironmentBackedStore, SettingsBackedStore, StoreError,
    StoreResult, StoreValidation,
};

pub use router::StrategyRouter;

pub use migration::{
    BackupSink, MemoryBackupSink, MigrationBackup, MigrationEngine, MigrationOutcome,
    MigrationRequest, MigrationState, MigrationStep,
};

pub use crypto::SecretCipher;

pub use validation::{validate, validate_base_url, validate_for_id, ValidationResult};

pub use settings::{JsonFileSettings, MemorySettingsDocument, SettingsDocument, SettingsScope};

pub use environment::{EnvTable, MemoryEnv, ProcessEnv};

pub use logging::{ConsoleLogger, Logger, NoOpLogger, SharedLogger};

pub use acquisition::{NullSecretSource, SecretSource, StaticSecretSource};
