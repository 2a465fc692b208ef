//! Core trait and types for credential stores

use std::collections::HashMap;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::settings::SettingsScope;
use crate::types::Provider;

/// Result of reading a credential, with absence and corruption kept apart
///
/// `Corrupted` means the store holds something for the provider but cannot
/// produce the secret (e.g., the envelope fails to decrypt). The plain read
/// path collapses this to "absent"; diagnostics should use this instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialLookup {
    /// The store holds a readable secret
    Present(String),
    /// The store holds nothing for this provider
    Absent,
    /// The store holds an entry that cannot be read
    Corrupted(String),
}

impl CredentialLookup {
    /// The secret, if present and readable
    pub fn secret(&self) -> Option<&str> {
        match self {
            CredentialLookup::Present(secret) => Some(secret),
            _ => None,
        }
    }
}

/// Errors that can occur during credential store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation failed for provider '{provider}': {}", issues.join("; "))]
    Validation { provider: String, issues: Vec<String> },

    #[error("{operation} failed for provider '{provider}': {message}")]
    Storage {
        operation: String,
        provider: String,
        message: String,
    },

    #[error("encryption error: {0}")]
    Encryption(#[from] CryptoError),

    #[error("{operation} failed for provider '{provider}': {source}")]
    Context {
        operation: String,
        provider: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// A storage failure tagged with the operation and provider
    pub fn storage(
        operation: impl Into<String>,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Storage {
            operation: operation.into(),
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with operation + provider context
    pub fn context(self, operation: impl Into<String>, provider: impl Into<String>) -> Self {
        StoreError::Context {
            operation: operation.into(),
            provider: provider.into(),
            source: Box::new(self),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregate validation over everything a store currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

impl StoreValidation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
        }
    }

    pub(crate) fn push_issues(&mut self, issues: impl IntoIterator<Item = String>) {
        for issue in issues {
            self.is_valid = false;
            self.issues.push(issue);
        }
    }
}

/// Trait for credential storage backends
///
/// The domain has exactly two implementations; see the module docs. Writes
/// validate through the credential validator before persisting. The `scope`
/// parameter selects the persistence tier for stores that have tiers and is
/// ignored by stores that do not.
pub trait CredentialStore: Send + Sync {
    /// Stable name of this store ("settings" or "environment")
    fn name(&self) -> &str;

    /// Whether this store can own the given provider's credential
    fn supports_provider(&self, provider: &Provider) -> bool;

    /// Validate and persist a credential
    fn set_credential(
        &self,
        provider: &Provider,
        secret: &str,
        scope: SettingsScope,
    ) -> StoreResult<()>;

    /// Read a credential; unreadable entries are treated as absent
    fn get_credential(&self, provider: &Provider) -> StoreResult<Option<String>>;

    /// Read a credential, distinguishing absence from corruption
    fn lookup_credential(&self, provider: &Provider) -> CredentialLookup;

    /// Remove a credential
    fn remove_credential(&self, provider: &Provider, scope: SettingsScope) -> StoreResult<()>;

    /// All credentials this store currently holds, keyed by provider id
    fn list_credentials(&self) -> StoreResult<HashMap<String, String>>;

    /// Validate everything this store currently holds
    fn validate_all(&self) -> StoreValidation;

    /// Check if a credential exists and is readable
    fn has_credential(&self, provider: &Provider) -> bool {
        matches!(self.lookup_credential(provider), CredentialLookup::Present(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_chain() {
        let inner = StoreError::storage("set", "zai", "disk full");
        let wrapped = inner.context("migrate", "zai");

        let message = wrapped.to_string();
        assert!(message.contains("migrate"));
        assert!(message.contains("zai"));

        // The source is preserved for callers that walk the chain
        let source = std::error::Error::source(&wrapped).unwrap();
        assert!(source.to_string().contains("disk full"));
    }

    #[test]
    fn test_lookup_secret_accessor() {
        assert_eq!(CredentialLookup::Present("s".into()).secret(), Some("s"));
        assert_eq!(CredentialLookup::Absent.secret(), None);
        assert_eq!(CredentialLookup::Corrupted("bad".into()).secret(), None);
    }
}
