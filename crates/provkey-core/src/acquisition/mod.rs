//! Secret acquisition from the hosting caller
//!
//! The migration engine needs a way to obtain a secret when no legacy
//! credential exists. The host (a command palette, a prompt, a script)
//! implements `SecretSource`; returning `None` from `secret_for` means the
//! user cancelled, which aborts the operation with no side effects.

use crate::types::Provider;

/// Supplies secrets and paired base URLs on demand
pub trait SecretSource: Send + Sync {
    /// The secret for a provider, or `None` if the user cancelled
    fn secret_for(&self, provider: &Provider) -> Option<String>;

    /// A base URL override for a provider
    ///
    /// `None` means "no override": the provider's default base URL is used.
    fn base_url_for(&self, _provider: &Provider) -> Option<String> {
        None
    }
}

/// A source with fixed answers, for scripts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSecretSource {
    secret: Option<String>,
    base_url: Option<String>,
}

impl StaticSecretSource {
    /// A source that always supplies the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            base_url: None,
        }
    }

    /// Also supply a base URL override
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl SecretSource for StaticSecretSource {
    fn secret_for(&self, _provider: &Provider) -> Option<String> {
        self.secret.clone()
    }

    fn base_url_for(&self, _provider: &Provider) -> Option<String> {
        self.base_url.clone()
    }
}

/// A source that always cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSecretSource;

impl SecretSource for NullSecretSource {
    fn secret_for(&self, _provider: &Provider) -> Option<String> {
        None
    }
}
