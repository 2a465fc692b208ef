//! Per-provider credential shape validation
//!
//! Validation is pure: the same inputs always produce the same result, no
//! side effects, and it never fails. Issues block a write; warnings are
//! advisory only.

use url::Url;

use crate::types::{provider_by_id, Provider, StorageMethod};

/// Result of validating a secret or paired value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the value is acceptable for a write
    pub is_valid: bool,
    /// Fatal problems that block a write
    pub issues: Vec<String>,
    /// Advisory problems that do not block a write
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A result with no issues and no warnings
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn issue(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.issues.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid = self.is_valid && other.is_valid;
        self.issues.extend(other.issues);
        self.warnings.extend(other.warnings);
    }
}

/// Validate a secret against a provider's rules
pub fn validate(provider: &Provider, secret: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if secret.trim().is_empty() {
        result.issue("secret is empty");
        return result;
    }

    if secret.len() < provider.min_secret_len {
        result.issue(format!(
            "secret for '{}' is too short: {} characters, minimum {}",
            provider.id,
            secret.len(),
            provider.min_secret_len
        ));
    }

    if let Some(prefix) = provider.key_prefix {
        if !secret.starts_with(prefix) {
            match provider.storage {
                // Settings-backed providers issue prefixed keys; a wrong
                // prefix means a wrong key.
                StorageMethod::Settings => {
                    result.issue(format!(
                        "secret for '{}' must start with '{}'",
                        provider.id, prefix
                    ));
                }
                _ => {
                    result.warning(format!(
                        "secret for '{}' does not start with the usual '{}' prefix",
                        provider.id, prefix
                    ));
                }
            }
        }
    }

    if secret.chars().any(char::is_whitespace) {
        result.warning("secret contains whitespace characters");
    }

    // Barely above the minimum usually means a truncated paste.
    if result.is_valid && secret.len() < provider.min_secret_len + 4 {
        result.warning(format!(
            "secret for '{}' is unusually short ({} characters)",
            provider.id,
            secret.len()
        ));
    }

    result
}

/// Validate a secret for a provider id, falling back to generic rules when
/// the id is not in the registry
pub fn validate_for_id(provider_id: &str, secret: &str) -> ValidationResult {
    match provider_by_id(provider_id) {
        Some(provider) => validate(provider, secret),
        None => {
            let mut result = ValidationResult::ok();
            if secret.trim().is_empty() {
                result.issue("secret is empty");
            } else if secret.len() < crate::types::UNKNOWN_PROVIDER_MIN_LEN {
                result.issue(format!(
                    "secret for '{}' is too short: {} characters, minimum {}",
                    provider_id,
                    secret.len(),
                    crate::types::UNKNOWN_PROVIDER_MIN_LEN
                ));
            }
            result
        }
    }
}

/// Validate a paired base URL value
///
/// The value must be a well-formed absolute HTTP(S) URL. Plain `http` is
/// accepted with a warning.
pub fn validate_base_url(base_url: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if base_url.trim().is_empty() {
        result.issue("base URL is empty");
        return result;
    }

    match Url::parse(base_url) {
        Ok(url) => match url.scheme() {
            "https" => {}
            "http" => result.warning("base URL uses plain http"),
            other => result.issue(format!(
                "base URL scheme must be http or https, got '{}'",
                other
            )),
        },
        Err(e) => result.issue(format!("base URL is not a valid absolute URL: {}", e)),
    }

    result
}
