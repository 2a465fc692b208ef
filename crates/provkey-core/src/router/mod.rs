//! Strategy routing across the two credential stores
//!
//! The router decides, per provider, which store owns the credential, and
//! aggregates views across both stores.

use std::collections::HashMap;
use std::sync::Arc;

use crate::log_debug;
use crate::logging::SharedLogger;
use crate::settings::SettingsScope;
use crate::stores::{
    CredentialStore, EnvironmentBackedStore, SettingsBackedStore, StoreResult,
};
use crate::types::{CredentialRecord, Provider, StorageMethod};
use crate::validation::{self, ValidationResult};

/// Routes credential operations to the store that owns each provider
///
/// Selection is deterministic and never fails:
/// 1. an explicit method whose store supports the provider wins;
/// 2. otherwise the provider's canonical storage method decides;
/// 3. otherwise the settings store is the safe default.
pub struct StrategyRouter {
    settings: Arc<SettingsBackedStore>,
    environment: Arc<EnvironmentBackedStore>,
    logger: SharedLogger,
}

impl StrategyRouter {
    /// Create a router over the two stores
    pub fn new(
        settings: Arc<SettingsBackedStore>,
        environment: Arc<EnvironmentBackedStore>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            settings,
            environment,
            logger,
        }
    }

    /// The settings-backed store
    pub fn settings_store(&self) -> &Arc<SettingsBackedStore> {
        &self.settings
    }

    /// The environment-backed store
    pub fn environment_store(&self) -> &Arc<EnvironmentBackedStore> {
        &self.environment
    }

    fn store_by_method(&self, method: StorageMethod) -> &dyn CredentialStore {
        match method {
            StorageMethod::Environment => self.environment.as_ref(),
            // Hybrid providers default to the settings store
            StorageMethod::Settings | StorageMethod::Hybrid => self.settings.as_ref(),
        }
    }

    /// The store that owns a provider's credential
    pub fn store_for(
        &self,
        provider: &Provider,
        explicit: Option<StorageMethod>,
    ) -> &dyn CredentialStore {
        if let Some(method) = explicit {
            let store = self.store_by_method(method);
            if store.supports_provider(provider) {
                return store;
            }
            log_debug!(
                self.logger,
                "explicit method '{}' does not support '{}', falling back to canonical",
                method,
                provider.id
            );
        }

        let canonical = self.store_by_method(provider.storage);
        if canonical.supports_provider(provider) {
            return canonical;
        }

        // Safe default
        self.settings.as_ref()
    }

    /// Read a provider's credential from its owning store
    pub fn get_credential(&self, provider: &Provider) -> StoreResult<Option<String>> {
        self.store_for(provider, None)
            .get_credential(provider)
            .map_err(|e| e.context("get", provider.id))
    }

    /// Validate and write a provider's credential into its owning store
    pub fn set_credential(
        &self,
        provider: &Provider,
        secret: &str,
        scope: SettingsScope,
    ) -> StoreResult<()> {
        self.store_for(provider, None)
            .set_credential(provider, secret, scope)
            .map_err(|e| e.context("set", provider.id))
    }

    /// Remove a provider's credential from its owning store
    pub fn remove_credential(&self, provider: &Provider, scope: SettingsScope) -> StoreResult<()> {
        self.store_for(provider, None)
            .remove_credential(provider, scope)
            .map_err(|e| e.context("remove", provider.id))
    }

    /// All credentials across both stores, keyed by provider id
    ///
    /// Invariant: when both stores hold a value for the same provider, the
    /// environment store wins. The settings store is merged first and the
    /// environment store second.
    pub fn all_credentials(&self) -> StoreResult<HashMap<String, String>> {
        let mut merged = self.settings.list_credentials()?;
        for (provider_id, secret) in self.environment.list_credentials()? {
            merged.insert(provider_id, secret);
        }
        Ok(merged)
    }

    /// A record of a provider's stored credential, validated now
    ///
    /// `None` when the provider is not configured. The record's location is
    /// the store that actually holds the credential, which may differ from
    /// the provider's canonical method for hybrid providers.
    pub fn credential_record(&self, provider: &Provider) -> StoreResult<Option<CredentialRecord>> {
        let store = self.store_for(provider, None);
        let Some(secret) = store
            .get_credential(provider)
            .map_err(|e| e.context("record", provider.id))?
        else {
            return Ok(None);
        };

        let location = match store.name() {
            "environment" => StorageMethod::Environment,
            _ => StorageMethod::Settings,
        };
        let mut record = CredentialRecord::new(provider.id, secret, location);
        record.mark_validated(self.validate_provider(provider).is_valid);
        Ok(Some(record))
    }

    /// Records for every configured provider
    pub fn all_records(&self) -> StoreResult<Vec<CredentialRecord>> {
        let mut records = Vec::new();
        for provider in crate::types::registered_providers() {
            if let Some(record) = self.credential_record(provider)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Validate a provider's currently stored credential
    ///
    /// An unconfigured provider is invalid with a "not configured" issue;
    /// storage errors surface as issues rather than escaping, since
    /// validation itself never fails.
    pub fn validate_provider(&self, provider: &Provider) -> ValidationResult {
        let store = self.store_for(provider, None);
        let secret = match store.get_credential(provider) {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                return ValidationResult {
                    is_valid: false,
                    issues: vec![format!("provider '{}' is not configured", provider.id)],
                    warnings: Vec::new(),
                };
            }
            Err(e) => {
                return ValidationResult {
                    is_valid: false,
                    issues: vec![format!("could not read credential for '{}': {}", provider.id, e)],
                    warnings: Vec::new(),
                };
            }
        };

        let mut result = validation::validate(provider, &secret);
        if store.name() == "environment" {
            match self.environment.base_url(provider) {
                Some(url) => result.merge(validation::validate_base_url(&url)),
                None => result.merge(ValidationResult {
                    is_valid: false,
                    issues: vec![format!("base URL for '{}' is not set", provider.id)],
                    warnings: Vec::new(),
                }),
            }
        }
        result
    }
}

impl std::fmt::Debug for StrategyRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRouter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretCipher;
    use crate::environment::{EnvTable, MemoryEnv};
    use crate::logging::NoOpLogger;
    use crate::settings::{MemorySettingsDocument, SettingsDocument};
    use crate::types::provider_by_id;

    fn test_router() -> (Arc<MemorySettingsDocument>, Arc<MemoryEnv>, StrategyRouter) {
        let doc = Arc::new(MemorySettingsDocument::new());
        let env = Arc::new(MemoryEnv::new());
        let logger: SharedLogger = Arc::new(NoOpLogger);
        let settings = Arc::new(SettingsBackedStore::new(
            doc.clone(),
            SecretCipher::from_passphrase("test"),
            logger.clone(),
        ));
        let environment = Arc::new(EnvironmentBackedStore::with_ttl(
            env.clone(),
            logger.clone(),
            std::time::Duration::ZERO,
        ));
        (doc, env, StrategyRouter::new(settings, environment, logger))
    }

    #[test]
    fn test_canonical_selection() {
        let (_, _, router) = test_router();

        let anthropic = provider_by_id("anthropic").unwrap();
        let zai = provider_by_id("zai").unwrap();
        let custom = provider_by_id("custom").unwrap();

        assert_eq!(router.store_for(anthropic, None).name(), "settings");
        assert_eq!(router.store_for(zai, None).name(), "environment");
        // Hybrid defaults to settings
        assert_eq!(router.store_for(custom, None).name(), "settings");
    }

    #[test]
    fn test_explicit_method_wins_when_supported() {
        let (_, _, router) = test_router();
        let zai = provider_by_id("zai").unwrap();

        assert_eq!(
            router.store_for(zai, Some(StorageMethod::Environment)).name(),
            "environment"
        );
    }

    #[test]
    fn test_unsupported_explicit_method_falls_back() {
        let (_, _, router) = test_router();
        let anthropic = provider_by_id("anthropic").unwrap();

        // The environment store has no mapping for anthropic
        assert_eq!(
            router.store_for(anthropic, Some(StorageMethod::Environment)).name(),
            "settings"
        );
    }

    #[test]
    fn test_selection_is_deterministic() {
        let (_, _, router) = test_router();
        let zai = provider_by_id("zai").unwrap();

        for _ in 0..3 {
            assert_eq!(router.store_for(zai, None).name(), "environment");
            assert_eq!(
                router.store_for(zai, Some(StorageMethod::Settings)).name(),
                "environment"
            );
        }
    }

    #[test]
    fn test_crud_delegation() {
        let (_, env, router) = test_router();
        let anthropic = provider_by_id("anthropic").unwrap();
        let zai = provider_by_id("zai").unwrap();

        router
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Global)
            .unwrap();
        router
            .set_credential(zai, "zai-abc1234567", SettingsScope::Global)
            .unwrap();

        assert_eq!(
            router.get_credential(anthropic).unwrap(),
            Some("sk-ant-REDACTED".to_string())
        );
        assert_eq!(env.get("ANTHROPIC_AUTH_TOKEN"), Some("zai-abc1234567".to_string()));

        router.remove_credential(zai, SettingsScope::Global).unwrap();
        assert_eq!(router.get_credential(zai).unwrap(), None);
    }

    #[test]
    fn test_delegated_errors_carry_context() {
        let (_, _, router) = test_router();
        let anthropic = provider_by_id("anthropic").unwrap();

        let err = router
            .set_credential(anthropic, "bad", SettingsScope::Global)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("set"));
        assert!(message.contains("anthropic"));
    }

    #[test]
    fn aggregation_environment_wins() {
        let (doc, env, router) = test_router();
        let zai = provider_by_id("zai").unwrap();

        // zai value A in the settings store (legacy, pre-migration entry)
        let cipher = SecretCipher::from_passphrase("test");
        let envelope = cipher.encrypt("zai-from-settings").unwrap();
        doc.update(
            &SettingsBackedStore::setting_key(zai),
            Some(serde_json::Value::String(envelope)),
            SettingsScope::Global,
        )
        .unwrap();

        // Settings value is visible while the environment is empty
        let all = router.all_credentials().unwrap();
        assert_eq!(all["zai"], "zai-from-settings");

        // zai value B in the environment store: exactly one value survives
        // the merge, and it is the environment's.
        env.set("ANTHROPIC_AUTH_TOKEN", "zai-from-env-111").unwrap();
        let all = router.all_credentials().unwrap();
        assert_eq!(all["zai"], "zai-from-env-111");
    }

    #[test]
    fn test_validate_provider_not_configured() {
        let (_, _, router) = test_router();
        let zai = provider_by_id("zai").unwrap();

        let result = router.validate_provider(zai);
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i.contains("not configured")));
    }

    #[test]
    fn test_validate_provider_checks_base_url() {
        let (_, env, router) = test_router();
        let zai = provider_by_id("zai").unwrap();

        env.set("ANTHROPIC_AUTH_TOKEN", "zai-abc1234567").unwrap();

        // Token set but base URL missing
        let result = router.validate_provider(zai);
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i.contains("base URL")));

        env.set("ANTHROPIC_BASE_URL", "https://api.z.ai/v1").unwrap();
        assert!(router.validate_provider(zai).is_valid);
    }

    #[test]
    fn test_credential_record_reflects_owning_store() {
        let (_, env, router) = test_router();
        let anthropic = provider_by_id("anthropic").unwrap();
        let zai = provider_by_id("zai").unwrap();

        assert!(router.credential_record(anthropic).unwrap().is_none());

        router
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Global)
            .unwrap();
        env.set("ANTHROPIC_AUTH_TOKEN", "zai-abc1234567").unwrap();
        env.set("ANTHROPIC_BASE_URL", "https://api.z.ai/v1").unwrap();

        let record = router.credential_record(anthropic).unwrap().unwrap();
        assert_eq!(record.location, StorageMethod::Settings);
        assert_eq!(record.status, crate::types::ValidationStatus::Valid);
        assert!(record.last_validated.is_some());

        let record = router.credential_record(zai).unwrap().unwrap();
        assert_eq!(record.location, StorageMethod::Environment);
        assert_eq!(record.secret, "zai-abc1234567");
    }

    #[test]
    fn test_record_marks_invalid_base_url() {
        let (_, env, router) = test_router();
        let zai = provider_by_id("zai").unwrap();

        env.set("ANTHROPIC_AUTH_TOKEN", "zai-abc1234567").unwrap();
        env.set("ANTHROPIC_BASE_URL", "not a url").unwrap();

        let record = router.credential_record(zai).unwrap().unwrap();
        assert_eq!(record.status, crate::types::ValidationStatus::Invalid);
    }

    #[test]
    fn test_all_records_covers_both_stores() {
        let (_, env, router) = test_router();
        let anthropic = provider_by_id("anthropic").unwrap();

        router
            .set_credential(anthropic, "sk-ant-REDACTED", SettingsScope::Global)
            .unwrap();
        env.set("ANTHROPIC_AUTH_TOKEN", "zai-abc1234567").unwrap();
        env.set("ANTHROPIC_BASE_URL", "https://api.z.ai/v1").unwrap();

        let records = router.all_records().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.provider_id.as_str()).collect();
        assert_eq!(ids, vec!["anthropic", "zai"]);
    }
}
