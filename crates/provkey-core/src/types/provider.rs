//! Provider definitions and the static provider registry

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Canonical storage method for a provider's credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMethod {
    /// Encrypted entry in the persisted settings document
    Settings,
    /// Process environment variables
    Environment,
    /// Either store may hold the credential; settings is the default owner
    Hybrid,
}

impl StorageMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMethod::Settings => "settings",
            StorageMethod::Environment => "environment",
            StorageMethod::Hybrid => "hybrid",
        }
    }

    /// Parse a storage method from its string form
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "settings" => Some(StorageMethod::Settings),
            "environment" | "env" => Some(StorageMethod::Environment),
            "hybrid" => Some(StorageMethod::Hybrid),
            _ => None,
        }
    }
}

impl std::fmt::Display for StorageMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment variable names a provider's credential maps onto
///
/// Names are exact and case-sensitive. Both variables must be set for the
/// provider to count as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarSpec {
    /// Variable holding the service base URL
    pub base_url_var: &'static str,
    /// Variable holding the auth token
    pub token_var: &'static str,
    /// Base URL used when the caller does not supply one
    pub default_base_url: &'static str,
}

impl EnvVarSpec {
    /// All variable names required for this provider, in write order
    pub fn var_names(&self) -> [&'static str; 2] {
        [self.base_url_var, self.token_var]
    }
}

/// An upstream model/service whose credential this crate manages
///
/// Providers are immutable and defined in the static registry below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    /// Stable identifier (e.g., "anthropic")
    pub id: &'static str,
    /// Human-readable name for UI callers
    pub display_name: &'static str,
    /// Where this provider's credential canonically lives
    pub storage: StorageMethod,
    /// Environment variable mapping, for environment-backed providers
    pub env: Option<EnvVarSpec>,
    /// Expected secret prefix, when the provider issues prefixed keys
    pub key_prefix: Option<&'static str>,
    /// Minimum acceptable secret length
    pub min_secret_len: usize,
}

impl Provider {
    /// The base URL to use when the caller supplies none
    pub fn default_base_url(&self) -> Option<&'static str> {
        self.env.as_ref().map(|e| e.default_base_url)
    }
}

/// Minimum secret length applied to providers outside the registry
pub(crate) const UNKNOWN_PROVIDER_MIN_LEN: usize = 5;

/// Static registry of supported providers
static PROVIDERS: Lazy<Vec<Provider>> = Lazy::new(|| {
    vec![
        Provider {
            id: "anthropic",
            display_name: "Anthropic",
            storage: StorageMethod::Settings,
            env: None,
            key_prefix: Some("sk-ant-"),
            min_secret_len: 20,
        },
        Provider {
            id: "openai",
            display_name: "OpenAI",
            storage: StorageMethod::Settings,
            env: None,
            key_prefix: Some("sk-"),
            min_secret_len: 20,
        },
        Provider {
            id: "zai",
            display_name: "Z.AI",
            storage: StorageMethod::Environment,
            env: Some(EnvVarSpec {
                base_url_var: "ANTHROPIC_BASE_URL",
                token_var: "ANTHROPIC_AUTH_TOKEN",
                default_base_url: "https://api.z.ai/api/anthropic",
            }),
            key_prefix: None,
            min_secret_len: 10,
        },
        Provider {
            id: "custom",
            display_name: "Custom endpoint",
            storage: StorageMethod::Hybrid,
            env: None,
            key_prefix: None,
            min_secret_len: UNKNOWN_PROVIDER_MIN_LEN,
        },
    ]
});

/// Look up a provider by id (case-insensitive)
pub fn provider_by_id(id: &str) -> Option<&'static Provider> {
    let lower = id.to_lowercase();
    PROVIDERS.iter().find(|p| p.id == lower)
}

/// All registered providers, in declaration order
pub fn registered_providers() -> &'static [Provider] {
    &PROVIDERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_method_roundtrip() {
        assert_eq!(StorageMethod::parse("settings"), Some(StorageMethod::Settings));
        assert_eq!(StorageMethod::parse("ENVIRONMENT"), Some(StorageMethod::Environment));
        assert_eq!(StorageMethod::parse("env"), Some(StorageMethod::Environment));
        assert_eq!(StorageMethod::parse("hybrid"), Some(StorageMethod::Hybrid));
        assert_eq!(StorageMethod::parse("keychain"), None);
        assert_eq!(StorageMethod::Settings.as_str(), "settings");
    }

    #[test]
    fn test_registry_lookup() {
        let anthropic = provider_by_id("anthropic").unwrap();
        assert_eq!(anthropic.storage, StorageMethod::Settings);
        assert_eq!(anthropic.key_prefix, Some("sk-ant-"));

        // Case insensitive
        assert!(provider_by_id("Anthropic").is_some());
        assert!(provider_by_id("nonexistent_xyz").is_none());
    }

    #[test]
    fn test_zai_env_mapping() {
        let zai = provider_by_id("zai").unwrap();
        let spec = zai.env.as_ref().unwrap();
        assert_eq!(spec.base_url_var, "ANTHROPIC_BASE_URL");
        assert_eq!(spec.token_var, "ANTHROPIC_AUTH_TOKEN");
        assert_eq!(spec.var_names(), ["ANTHROPIC_BASE_URL", "ANTHROPIC_AUTH_TOKEN"]);
        assert_eq!(zai.default_base_url(), Some("https://api.z.ai/api/anthropic"));
    }

    #[test]
    fn test_registry_order_stable() {
        let ids: Vec<_> = registered_providers().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["anthropic", "openai", "zai", "custom"]);
    }
}
