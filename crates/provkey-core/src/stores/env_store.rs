//! Environment-backed credential store
//!
//! Reads and writes the injected environment table. A provider maps to a
//! base-URL variable and an auth-token variable; both are written on set.
//! Reads go through a short-lived cache to avoid repeated environment
//! lookups.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::environment::EnvTable;
use crate::log_debug;
use crate::logging::SharedLogger;
use crate::settings::SettingsScope;
use crate::types::{registered_providers, EnvVarSpec, Provider, StorageMethod};
use crate::validation;

use super::traits::{
    CredentialLookup, CredentialStore, StoreError, StoreResult, StoreValidation,
};

/// How long a cached read stays fresh
const READ_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    value: Option<String>,
    fetched_at: Instant,
}

/// Credential store backed by process environment variables
///
/// Changes are visible only to the running process and are lost on restart
/// unless the caller persists setup metadata separately. The read cache
/// bounds staleness to the TTL; this process is in practice the sole writer
/// of the variables it manages, and every write/remove through this store
/// invalidates the provider's entry.
pub struct EnvironmentBackedStore {
    env: Arc<dyn EnvTable>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    logger: SharedLogger,
}

impl EnvironmentBackedStore {
    /// Create a store over an environment table
    pub fn new(env: Arc<dyn EnvTable>, logger: SharedLogger) -> Self {
        Self::with_ttl(env, logger, READ_CACHE_TTL)
    }

    /// Create a store with a custom cache TTL (tests)
    pub fn with_ttl(env: Arc<dyn EnvTable>, logger: SharedLogger, ttl: Duration) -> Self {
        Self {
            env,
            cache: Mutex::new(HashMap::new()),
            ttl,
            logger,
        }
    }

    fn spec_for<'p>(&self, provider: &'p Provider, operation: &str) -> StoreResult<&'p EnvVarSpec> {
        provider.env.as_ref().ok_or_else(|| {
            StoreError::storage(
                operation,
                provider.id,
                "provider has no environment variable mapping",
            )
        })
    }

    fn invalidate(&self, provider: &Provider) {
        self.cache.lock().remove(provider.id);
    }

    /// Current base URL value for an environment-backed provider
    ///
    /// Reads the environment directly; not cached.
    pub fn base_url(&self, provider: &Provider) -> Option<String> {
        provider
            .env
            .as_ref()
            .and_then(|spec| self.env.get(spec.base_url_var))
    }

    /// Validate and write a credential, overriding the provider's default
    /// base URL
    ///
    /// All required variables are assigned in sequence. If a later
    /// assignment fails, variables already set are left in place; the
    /// caller sees the failure but no rollback occurs.
    pub fn set_credential_with_base_url(
        &self,
        provider: &Provider,
        secret: &str,
        base_url: Option<&str>,
    ) -> StoreResult<()> {
        let spec = self.spec_for(provider, "set")?;

        let mut result = validation::validate(provider, secret);
        let url = base_url.unwrap_or(spec.default_base_url);
        result.merge(validation::validate_base_url(url));
        if !result.is_valid {
            return Err(StoreError::Validation {
                provider: provider.id.to_string(),
                issues: result.issues,
            });
        }

        self.env
            .set(spec.base_url_var, url)
            .map_err(|e| StoreError::storage("set", provider.id, e.to_string()))?;
        self.env
            .set(spec.token_var, secret)
            .map_err(|e| StoreError::storage("set", provider.id, e.to_string()))?;

        self.invalidate(provider);
        log_debug!(self.logger, "environment credential set for '{}'", provider.id);
        Ok(())
    }
}

impl CredentialStore for EnvironmentBackedStore {
    fn name(&self) -> &str {
        "environment"
    }

    fn supports_provider(&self, provider: &Provider) -> bool {
        provider.env.is_some()
            && matches!(
                provider.storage,
                StorageMethod::Environment | StorageMethod::Hybrid
            )
    }

    fn set_credential(
        &self,
        provider: &Provider,
        secret: &str,
        _scope: SettingsScope,
    ) -> StoreResult<()> {
        self.set_credential_with_base_url(provider, secret, None)
    }

    fn get_credential(&self, provider: &Provider) -> StoreResult<Option<String>> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(provider.id) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.value.clone());
            }
        }

        let value = provider
            .env
            .as_ref()
            .and_then(|spec| self.env.get(spec.token_var));
        cache.insert(
            provider.id.to_string(),
            CacheEntry {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    fn lookup_credential(&self, provider: &Provider) -> CredentialLookup {
        // The environment has no corruption mode: a variable is either set
        // or it is not.
        match self.get_credential(provider) {
            Ok(Some(secret)) => CredentialLookup::Present(secret),
            _ => CredentialLookup::Absent,
        }
    }

    fn remove_credential(&self, provider: &Provider, _scope: SettingsScope) -> StoreResult<()> {
        let spec = self.spec_for(provider, "remove")?;
        for name in spec.var_names() {
            self.env
                .remove(name)
                .map_err(|e| StoreError::storage("remove", provider.id, e.to_string()))?;
        }
        self.invalidate(provider);
        Ok(())
    }

    fn list_credentials(&self) -> StoreResult<HashMap<String, String>> {
        let mut credentials = HashMap::new();
        for provider in registered_providers() {
            if provider.env.is_none() {
                continue;
            }
            if let Some(secret) = self.get_credential(provider)? {
                credentials.insert(provider.id.to_string(), secret);
            }
        }
        Ok(credentials)
    }

    fn validate_all(&self) -> StoreValidation {
        let mut report = StoreValidation::ok();
        for provider in registered_providers() {
            if provider.env.is_none() {
                continue;
            }
            let Ok(Some(secret)) = self.get_credential(provider) else {
                continue;
            };
            report.push_issues(validation::validate(provider, &secret).issues);
            if let Some(url) = self.base_url(provider) {
                report.push_issues(validation::validate_base_url(&url).issues);
            }
        }
        report
    }
}

impl std::fmt::Debug for EnvironmentBackedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentBackedStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
