//! Settings-backed credential store
//!
//! Persists credentials as encrypted envelopes in the injected settings
//! document, under `credentials.<provider id>`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::crypto::SecretCipher;
use crate::log_warn;
use crate::logging::SharedLogger;
use crate::settings::{SettingsDocument, SettingsScope};
use crate::types::{registered_providers, Provider, StorageMethod};
use crate::validation;

use super::traits::{
    CredentialLookup, CredentialStore, StoreError, StoreResult, StoreValidation,
};

/// Settings-document key prefix for credential entries
pub const CREDENTIAL_KEY_PREFIX: &str = "credentials.";

/// Credential store backed by the persisted settings document
///
/// Secrets are validated before every write, sealed with the injected
/// cipher, and opened transparently on read. An envelope that fails to
/// decrypt reads as absent on the plain path; `lookup_credential` reports
/// it as `Corrupted`.
pub struct SettingsBackedStore {
    doc: Arc<dyn SettingsDocument>,
    cipher: SecretCipher,
    logger: SharedLogger,
}

impl SettingsBackedStore {
    /// Create a store over a settings document
    pub fn new(doc: Arc<dyn SettingsDocument>, cipher: SecretCipher, logger: SharedLogger) -> Self {
        Self { doc, cipher, logger }
    }

    /// Settings-document key for a provider's credential entry
    pub fn setting_key(provider: &Provider) -> String {
        format!("{}{}", CREDENTIAL_KEY_PREFIX, provider.id)
    }

    /// Snapshot of every credential entry currently in the document
    ///
    /// Values are the raw (still encrypted) envelopes; used by the
    /// migration engine when capturing a backup.
    pub fn snapshot_entries(&self) -> HashMap<String, Value> {
        self.doc
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(CREDENTIAL_KEY_PREFIX))
            .filter_map(|k| self.doc.get(&k).map(|v| (k, v)))
            .collect()
    }

    /// Write a raw settings value back (migration restore path)
    pub fn restore_entry(&self, key: &str, value: Value, scope: SettingsScope) -> StoreResult<()> {
        let provider = key.strip_prefix(CREDENTIAL_KEY_PREFIX).unwrap_or(key);
        self.doc
            .update(key, Some(value), scope)
            .map_err(|e| StoreError::storage("restore", provider, e.to_string()))
    }
}

impl CredentialStore for SettingsBackedStore {
    fn name(&self) -> &str {
        "settings"
    }

    fn supports_provider(&self, provider: &Provider) -> bool {
        matches!(
            provider.storage,
            StorageMethod::Settings | StorageMethod::Hybrid
        )
    }

    fn set_credential(
        &self,
        provider: &Provider,
        secret: &str,
        scope: SettingsScope,
    ) -> StoreResult<()> {
        let result = validation::validate(provider, secret);
        if !result.is_valid {
            return Err(StoreError::Validation {
                provider: provider.id.to_string(),
                issues: result.issues,
            });
        }
        for warning in &result.warnings {
            log_warn!(self.logger, "{}: {}", provider.id, warning);
        }

        let envelope = self.cipher.encrypt(secret)?;
        self.doc
            .update(
                &Self::setting_key(provider),
                Some(Value::String(envelope)),
                scope,
            )
            .map_err(|e| StoreError::storage("set", provider.id, e.to_string()))
    }

    fn get_credential(&self, provider: &Provider) -> StoreResult<Option<String>> {
        match self.lookup_credential(provider) {
            CredentialLookup::Present(secret) => Ok(Some(secret)),
            CredentialLookup::Absent => Ok(None),
            CredentialLookup::Corrupted(reason) => {
                // Unreadable entries degrade to "not configured" so callers
                // can re-prompt instead of crashing.
                log_warn!(
                    self.logger,
                    "credential for '{}' is unreadable, treating as absent: {}",
                    provider.id,
                    reason
                );
                Ok(None)
            }
        }
    }

    fn lookup_credential(&self, provider: &Provider) -> CredentialLookup {
        let Some(value) = self.doc.get(&Self::setting_key(provider)) else {
            return CredentialLookup::Absent;
        };

        let Value::String(envelope) = value else {
            return CredentialLookup::Corrupted("entry is not a string".to_string());
        };

        match self.cipher.decrypt(&envelope) {
            Ok(secret) => CredentialLookup::Present(secret),
            Err(e) => CredentialLookup::Corrupted(e.to_string()),
        }
    }

    fn remove_credential(&self, provider: &Provider, scope: SettingsScope) -> StoreResult<()> {
        self.doc
            .update(&Self::setting_key(provider), None, scope)
            .map_err(|e| StoreError::storage("remove", provider.id, e.to_string()))
    }

    fn list_credentials(&self) -> StoreResult<HashMap<String, String>> {
        // Legacy entries may exist for providers this store no longer owns
        // (pre-migration state), so every registered provider is checked.
        let mut credentials = HashMap::new();
        for provider in registered_providers() {
            if let CredentialLookup::Present(secret) = self.lookup_credential(provider) {
                credentials.insert(provider.id.to_string(), secret);
            }
        }
        Ok(credentials)
    }

    fn validate_all(&self) -> StoreValidation {
        let mut report = StoreValidation::ok();
        for provider in registered_providers() {
            match self.lookup_credential(provider) {
                CredentialLookup::Present(secret) => {
                    report.push_issues(validation::validate(provider, &secret).issues);
                }
                CredentialLookup::Absent => {}
                CredentialLookup::Corrupted(reason) => {
                    report.push_issues([format!(
                        "credential for '{}' is unreadable: {}",
                        provider.id, reason
                    )]);
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for SettingsBackedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsBackedStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::settings::MemorySettingsDocument;
    use crate::types::provider_by_id;
    use serde_json::json;

    fn test_store() -> (Arc<MemorySettingsDocument>, SettingsBackedStore) {
        let doc = Arc::new(MemorySettingsDocument::new());
        let store = SettingsBackedStore::new(
            doc.clone(),
            SecretCipher::from_passphrase("test"),
            Arc::new(NoOpLogger),
        );
        (doc, store)
    }

    #[test]
    fn test_set_get_round_trip() {
        let (_, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();

        store
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Global)
            .unwrap();

        assert_eq!(
            store.get_credential(anthropic).unwrap(),
            Some("sk-ant-REDACTED".to_string())
        );
    }

    #[test]
    fn test_document_never_sees_plaintext() {
        let (doc, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();
        let secret = "sk-ant-REDACTED";

        store.set_credential(anthropic, secret, SettingsScope::Global).unwrap();

        let stored = doc.get("credentials.anthropic").unwrap();
        assert_ne!(stored, json!(secret));
        assert!(!stored.as_str().unwrap().contains(secret));
    }

    #[test]
    fn test_invalid_secret_blocks_write() {
        let (doc, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();

        let err = store
            .set_credential(anthropic, "wrong-prefix-0123456789", SettingsScope::Global)
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));

        // Nothing was persisted
        assert_eq!(doc.get("credentials.anthropic"), None);
    }

    #[test]
    fn test_corrupted_envelope_reads_absent_but_lookup_reports() {
        let (doc, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();

        doc.update("credentials.anthropic", Some(json!("not-an-envelope")), SettingsScope::Global)
            .unwrap();

        assert_eq!(store.get_credential(anthropic).unwrap(), None);
        assert!(matches!(
            store.lookup_credential(anthropic),
            CredentialLookup::Corrupted(_)
        ));
    }

    #[test]
    fn test_remove_credential() {
        let (_, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();

        store
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Global)
            .unwrap();
        store.remove_credential(anthropic, SettingsScope::Global).unwrap();

        assert_eq!(store.get_credential(anthropic).unwrap(), None);
    }

    #[test]
    fn test_scope_passes_through() {
        let (doc, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();

        store
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Workspace)
            .unwrap();

        assert!(doc.get_scoped("credentials.anthropic", SettingsScope::Workspace).is_some());
        assert!(doc.get_scoped("credentials.anthropic", SettingsScope::Global).is_none());
    }

    #[test]
    fn test_supports_provider() {
        let (_, store) = test_store();
        assert!(store.supports_provider(provider_by_id("anthropic").unwrap()));
        assert!(store.supports_provider(provider_by_id("custom").unwrap()));
        assert!(!store.supports_provider(provider_by_id("zai").unwrap()));
    }

    #[test]
    fn test_validate_all_flags_corruption() {
        let (doc, store) = test_store();

        doc.update("credentials.openai", Some(json!("garbage")), SettingsScope::Global)
            .unwrap();

        let report = store.validate_all();
        assert!(!report.is_valid);
        assert!(report.issues.iter().any(|i| i.contains("unreadable")));
    }

    /// Settings document whose writes always fail
    struct ReadOnlyDoc;

    impl SettingsDocument for ReadOnlyDoc {
        fn get(&self, _key: &str) -> Option<Value> {
            None
        }
        fn update(
            &self,
            _key: &str,
            _value: Option<Value>,
            _scope: SettingsScope,
        ) -> crate::settings::SettingsResult<()> {
            Err(crate::settings::SettingsError::Other(
                "document is read-only".to_string(),
            ))
        }
        fn keys(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_restore_error_names_the_provider() {
        let store = SettingsBackedStore::new(
            Arc::new(ReadOnlyDoc),
            SecretCipher::from_passphrase("test"),
            Arc::new(NoOpLogger),
        );

        let err = store
            .restore_entry("credentials.zai", json!("envelope"), SettingsScope::Global)
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("'zai'"), "message: {}", message);
        assert!(!message.contains("credentials.zai"));
    }

    #[test]
    fn test_list_credentials() {
        let (_, store) = test_store();
        let anthropic = provider_by_id("anthropic").unwrap();
        let openai = provider_by_id("openai").unwrap();

        store
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Global)
            .unwrap();
        store
            .set_credential(openai, "sk-abcdefghij0123456789", SettingsScope::Global)
            .unwrap();

        let listed = store.list_credentials().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed["anthropic"], "sk-ant-REDACTED");
    }
}
