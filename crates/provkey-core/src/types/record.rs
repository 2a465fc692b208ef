//! Credential records

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::provider::StorageMethod;

/// Outcome of the most recent validation of a stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unknown,
}

/// A credential as held by one store
///
/// Created on first successful write, mutated on update/remove. A record is
/// never shared between stores; once a migration completes, exactly one
/// store holds the provider's credential (enforced by the migration
/// engine's cleanup step, not by the stores).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Provider this credential belongs to
    pub provider_id: String,
    /// The secret value (opaque to this crate)
    pub secret: String,
    /// Storage location actually used
    pub location: StorageMethod,
    /// Unix timestamp of the last validation, if any
    pub last_validated: Option<u64>,
    /// Result of the last validation
    pub status: ValidationStatus,
}

impl CredentialRecord {
    /// Create a record for a freshly written credential
    pub fn new(provider_id: impl Into<String>, secret: impl Into<String>, location: StorageMethod) -> Self {
        Self {
            provider_id: provider_id.into(),
            secret: secret.into(),
            location,
            last_validated: None,
            status: ValidationStatus::Unknown,
        }
    }

    /// Mark the record as validated now
    pub fn mark_validated(&mut self, valid: bool) {
        self.last_validated = Some(unix_now());
        self.status = if valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
    }
}

/// Current time as seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current time as milliseconds since the Unix epoch
pub(crate) fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
