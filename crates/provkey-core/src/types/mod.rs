//! Core domain types: providers, the provider registry and credential records

mod provider;
mod record;

pub use provider::{
    provider_by_id, registered_providers, EnvVarSpec, Provider, StorageMethod,
};
pub(crate) use provider::UNKNOWN_PROVIDER_MIN_LEN;
pub use record::{CredentialRecord, ValidationStatus};
pub(crate) use record::unix_now_millis;
