//! The migration engine and its state machine

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::acquisition::SecretSource;
use crate::logging::SharedLogger;
use crate::router::StrategyRouter;
use crate::settings::SettingsScope;
use crate::stores::{CredentialStore, StoreResult};
use crate::types::Provider;
use crate::{log_info, log_warn};

use super::backup::{BackupSink, MigrationBackup};

/// Default bound on the verification connectivity probe
const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// A destructive (or potentially destructive) migration step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    Backup,
    Transfer,
    Verify,
    Cleanup,
}

impl MigrationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStep::Backup => "backup",
            MigrationStep::Transfer => "transfer",
            MigrationStep::Verify => "verify",
            MigrationStep::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a migration run currently stands
///
/// Created at the start of a run and discarded at the end; only the
/// `MigrationBackup` persists across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// The target store already satisfies requirements
    NotNeeded,
    /// A migration is required; nothing has been touched yet
    Detected,
    /// A backup has been captured
    BackedUp,
    /// The credential has been written to the target store
    Transferred,
    /// The target store passed verification
    Verified,
    /// The legacy credential has been removed
    CleanedUp,
    /// A step failed; the system is in the last successfully completed state
    Failed(MigrationStep),
}

/// A step failure, tagged with the step that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("migration step '{step}' failed: {message}")]
pub struct MigrationStepError {
    pub step: MigrationStep,
    pub message: String,
}

/// Structured result of a migration run
///
/// Failures are reported here rather than raised, so the caller can offer a
/// retry without losing the backup reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Whether the run ended in an acceptable state
    pub success: bool,
    /// The state the run ended in
    pub state: MigrationState,
    /// The failure, when a step failed
    pub error: Option<MigrationStepError>,
    /// Whether the caller cancelled secret acquisition
    pub cancelled: bool,
    /// Key of the backup captured during this run, if one was
    pub backup_timestamp: Option<u64>,
}

impl MigrationOutcome {
    fn done(state: MigrationState, backup_timestamp: Option<u64>) -> Self {
        Self {
            success: true,
            state,
            error: None,
            cancelled: false,
            backup_timestamp,
        }
    }

    fn failed(step: MigrationStep, message: impl Into<String>, backup_timestamp: Option<u64>) -> Self {
        Self {
            success: false,
            state: MigrationState::Failed(step),
            error: Some(MigrationStepError {
                step,
                message: message.into(),
            }),
            cancelled: false,
            backup_timestamp,
        }
    }

    fn cancelled() -> Self {
        Self {
            success: false,
            state: MigrationState::Detected,
            error: None,
            cancelled: true,
            backup_timestamp: None,
        }
    }

    /// The step that failed, if any
    pub fn failed_step(&self) -> Option<MigrationStep> {
        match self.state {
            MigrationState::Failed(step) => Some(step),
            _ => None,
        }
    }
}

/// Caller-supplied parameters for one migration run
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    /// Base URL override; the provider default is used when absent
    pub base_url: Option<String>,
    /// Whether the caller confirmed removal of the legacy credential
    pub confirm_cleanup: bool,
    /// Persistence tier for settings writes/removals
    pub scope: SettingsScope,
    /// Bound on the verification connectivity probe
    pub verify_timeout: Duration,
}

impl Default for MigrationRequest {
    fn default() -> Self {
        Self {
            base_url: None,
            confirm_cleanup: false,
            scope: SettingsScope::Global,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}

impl MigrationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn confirm_cleanup(mut self, confirm: bool) -> Self {
        self.confirm_cleanup = confirm;
        self
    }

    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }
}

/// Best-effort connectivity probe run during verification
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    /// Probe the endpoint; `Err` carries a human-readable reason
    async fn probe(&self, base_url: &str, token: &str) -> Result<(), String>;
}

/// HTTP probe: any response from the endpoint counts as reachable
///
/// Status codes are deliberately ignored; a 401 still proves the endpoint
/// exists and the URL is routable. Transport errors fail the probe.
pub struct HttpConnectivityCheck {
    client: reqwest::Client,
}

impl HttpConnectivityCheck {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpConnectivityCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityCheck for HttpConnectivityCheck {
    async fn probe(&self, base_url: &str, token: &str) -> Result<(), String> {
        self.client
            .get(base_url)
            .bearer_auth(token)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| format!("endpoint unreachable: {}", e))
    }
}

/// Orchestrates moving one provider's credential between stores
///
/// Steps run sequentially; a second concurrent run for the same provider is
/// the caller's responsibility to prevent (e.g., by disabling the
/// triggering action while one is in flight).
pub struct MigrationEngine {
    router: Arc<StrategyRouter>,
    sink: Arc<dyn BackupSink>,
    connectivity: Option<Arc<dyn ConnectivityCheck>>,
    logger: SharedLogger,
}

impl MigrationEngine {
    /// Create an engine without a connectivity probe
    pub fn new(router: Arc<StrategyRouter>, sink: Arc<dyn BackupSink>, logger: SharedLogger) -> Self {
        Self {
            router,
            sink,
            connectivity: None,
            logger,
        }
    }

    /// Attach a connectivity probe to the verification step
    pub fn with_connectivity(mut self, check: Arc<dyn ConnectivityCheck>) -> Self {
        self.connectivity = Some(check);
        self
    }

    fn expected_base_url(
        &self,
        provider: &Provider,
        source: &dyn SecretSource,
        request: &MigrationRequest,
    ) -> Option<String> {
        request
            .base_url
            .clone()
            .or_else(|| source.base_url_for(provider))
            .or_else(|| provider.default_base_url().map(String::from))
    }

    /// Whether the target store already satisfies the provider's
    /// requirements
    ///
    /// For environment targets this is an exact check: the token must be
    /// present and valid, and the base URL must equal the expected value.
    /// A previously configured but differently valued environment still
    /// needs migration.
    fn target_satisfied(
        &self,
        provider: &Provider,
        target: &dyn CredentialStore,
        expected_base_url: Option<&str>,
    ) -> bool {
        let secret = match target.get_credential(provider) {
            Ok(Some(secret)) => secret,
            _ => return false,
        };
        if !crate::validation::validate(provider, &secret).is_valid {
            return false;
        }

        if target.name() == "environment" {
            let current = self.router.environment_store().base_url(provider);
            if let Some(expected) = expected_base_url {
                return current.as_deref() == Some(expected);
            }
        }
        true
    }

    /// Run the migration state machine for one provider
    pub async fn run(
        &self,
        provider: &Provider,
        source: &dyn SecretSource,
        request: &MigrationRequest,
    ) -> MigrationOutcome {
        let target = self.router.store_for(provider, None);
        let legacy: &dyn CredentialStore = if target.name() == "environment" {
            self.router.settings_store().as_ref()
        } else {
            self.router.environment_store().as_ref()
        };
        let expected_url = self.expected_base_url(provider, source, request);

        // Detect
        if self.target_satisfied(provider, target, expected_url.as_deref()) {
            log_info!(self.logger, "migration not needed for '{}'", provider.id);
            return MigrationOutcome::done(MigrationState::NotNeeded, None);
        }

        let legacy_secret = match legacy.get_credential(provider) {
            Ok(secret) => secret,
            Err(e) => {
                log_warn!(self.logger, "legacy read failed for '{}': {}", provider.id, e);
                None
            }
        };
        let secret = match legacy_secret.clone().or_else(|| source.secret_for(provider)) {
            Some(secret) => secret,
            None => {
                log_info!(self.logger, "migration for '{}' cancelled by caller", provider.id);
                return MigrationOutcome::cancelled();
            }
        };

        // Backup, before anything destructive
        let backup = MigrationBackup::capture(
            legacy_secret.clone(),
            self.router.settings_store().snapshot_entries(),
        );
        if let Err(e) = self.sink.save(&backup) {
            return MigrationOutcome::failed(MigrationStep::Backup, e.to_string(), None);
        }
        let backup_ts = Some(backup.timestamp);

        // Transfer; on failure the legacy store is untouched, so the system
        // is still in its pre-migration state
        let written = if target.name() == "environment" {
            self.router.environment_store().set_credential_with_base_url(
                provider,
                &secret,
                expected_url.as_deref(),
            )
        } else {
            target.set_credential(provider, &secret, request.scope)
        };
        if let Err(e) = written {
            return MigrationOutcome::failed(MigrationStep::Transfer, e.to_string(), backup_ts);
        }

        // Verify; on failure the legacy credential is left intact and the
        // target write is left in place for the operator to inspect
        if let Some(outcome) = self
            .verify(provider, target, &secret, expected_url.as_deref(), request, backup_ts)
            .await
        {
            return outcome;
        }

        // Cleanup, only with explicit confirmation. Declining leaves the
        // credential in both stores; functional, just not hygienic.
        if !request.confirm_cleanup {
            log_info!(
                self.logger,
                "migration for '{}' verified; cleanup declined by caller",
                provider.id
            );
            return MigrationOutcome::done(MigrationState::Verified, backup_ts);
        }

        // An empty legacy store cleans up trivially; asking the environment
        // store to remove variables for an unmapped provider would error.
        if legacy.has_credential(provider) {
            if let Err(e) = legacy.remove_credential(provider, request.scope) {
                return MigrationOutcome::failed(MigrationStep::Cleanup, e.to_string(), backup_ts);
            }
        }

        log_info!(self.logger, "migration for '{}' completed", provider.id);
        MigrationOutcome::done(MigrationState::CleanedUp, backup_ts)
    }

    async fn verify(
        &self,
        provider: &Provider,
        target: &dyn CredentialStore,
        secret: &str,
        expected_url: Option<&str>,
        request: &MigrationRequest,
        backup_ts: Option<u64>,
    ) -> Option<MigrationOutcome> {
        let validation = self.router.validate_provider(provider);
        if !validation.is_valid {
            return Some(MigrationOutcome::failed(
                MigrationStep::Verify,
                validation.issues.join("; "),
                backup_ts,
            ));
        }

        // Exact read-back of what was just written
        match target.get_credential(provider) {
            Ok(Some(current)) if current == secret => {}
            _ => {
                return Some(MigrationOutcome::failed(
                    MigrationStep::Verify,
                    "target store did not read back the written secret",
                    backup_ts,
                ));
            }
        }
        if target.name() == "environment" {
            if let Some(expected) = expected_url {
                let current = self.router.environment_store().base_url(provider);
                if current.as_deref() != Some(expected) {
                    return Some(MigrationOutcome::failed(
                        MigrationStep::Verify,
                        format!(
                            "base URL mismatch: expected '{}', found '{}'",
                            expected,
                            current.as_deref().unwrap_or("<unset>")
                        ),
                        backup_ts,
                    ));
                }
            }
        }

        // Best-effort connectivity probe, bounded; a timeout is a
        // verification failure, not a crash
        if let (Some(check), Some(url)) = (&self.connectivity, expected_url) {
            match tokio::time::timeout(request.verify_timeout, check.probe(url, secret)).await {
                Ok(Ok(())) => {}
                Ok(Err(reason)) => {
                    return Some(MigrationOutcome::failed(MigrationStep::Verify, reason, backup_ts));
                }
                Err(_) => {
                    return Some(MigrationOutcome::failed(
                        MigrationStep::Verify,
                        "connectivity check timed out",
                        backup_ts,
                    ));
                }
            }
        }

        None
    }

    /// Write a backup's legacy credential and settings snapshot back
    ///
    /// Manual rollback path for the operator, for the case where
    /// verification failed after cleanup already ran. Step order makes that
    /// unreachable in a single run, but the backup outlives the run.
    pub fn restore(
        &self,
        provider: &Provider,
        backup: &MigrationBackup,
        scope: SettingsScope,
    ) -> StoreResult<()> {
        let settings = self.router.settings_store();
        for (key, value) in &backup.settings_snapshot {
            settings.restore_entry(key, value.clone(), scope)?;
        }
        if let Some(secret) = &backup.captured_secret {
            if !settings.has_credential(provider) {
                settings.set_credential(provider, secret, scope)?;
            }
        }
        log_info!(self.logger, "restored backup {} for '{}'", backup.timestamp, provider.id);
        Ok(())
    }
}

impl std::fmt::Debug for MigrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("has_connectivity_check", &self.connectivity.is_some())
            .finish_non_exhaustive()
    }
}
