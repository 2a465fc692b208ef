//! Explicit dependency wiring
//!
//! A `CredentialContext` owns one fully wired set of stores, router, and
//! migration engine. There is no process-global instance; callers build a
//! context with their own settings document, environment table, and cipher
//! key, and embedders can hold several contexts side by side (e.g. one per
//! profile) without interference.

use std::sync::Arc;

use crate::crypto::SecretCipher;
use crate::environment::{EnvTable, ProcessEnv};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::migration::{BackupSink, ConnectivityCheck, MemoryBackupSink, MigrationEngine};
use crate::router::StrategyRouter;
use crate::settings::SettingsDocument;
use crate::stores::{EnvironmentBackedStore, SettingsBackedStore};

/// One wired instance of the credential system
pub struct CredentialContext {
    settings: Arc<SettingsBackedStore>,
    environment: Arc<EnvironmentBackedStore>,
    router: Arc<StrategyRouter>,
    engine: Arc<MigrationEngine>,
}

impl CredentialContext {
    /// Start building a context
    ///
    /// The settings document and cipher have no defaults: persistence and
    /// the encryption key are always the caller's decision.
    pub fn builder(doc: Arc<dyn SettingsDocument>, cipher: SecretCipher) -> CredentialContextBuilder {
        CredentialContextBuilder {
            doc,
            cipher,
            env: None,
            sink: None,
            logger: None,
            connectivity: None,
        }
    }

    pub fn router(&self) -> &Arc<StrategyRouter> {
        &self.router
    }

    pub fn migration(&self) -> &Arc<MigrationEngine> {
        &self.engine
    }

    pub fn settings_store(&self) -> &Arc<SettingsBackedStore> {
        &self.settings
    }

    pub fn environment_store(&self) -> &Arc<EnvironmentBackedStore> {
        &self.environment
    }
}

impl std::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialContext").finish_non_exhaustive()
    }
}

/// Builder for [`CredentialContext`]
pub struct CredentialContextBuilder {
    doc: Arc<dyn SettingsDocument>,
    cipher: SecretCipher,
    env: Option<Arc<dyn EnvTable>>,
    sink: Option<Arc<dyn BackupSink>>,
    logger: Option<SharedLogger>,
    connectivity: Option<Arc<dyn ConnectivityCheck>>,
}

impl CredentialContextBuilder {
    /// Environment table backing the environment store
    ///
    /// Defaults to the process environment.
    pub fn env_table(mut self, env: Arc<dyn EnvTable>) -> Self {
        self.env = Some(env);
        self
    }

    /// Where migration backups are persisted
    ///
    /// Defaults to an in-memory sink; production embedders should supply a
    /// durable one so backups survive the process.
    pub fn backup_sink(mut self, sink: Arc<dyn BackupSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Connectivity probe used during migration verification
    pub fn connectivity(mut self, check: Arc<dyn ConnectivityCheck>) -> Self {
        self.connectivity = Some(check);
        self
    }

    pub fn build(self) -> CredentialContext {
        let logger = self.logger.unwrap_or_else(|| Arc::new(NoOpLogger));
        let env = self.env.unwrap_or_else(|| Arc::new(ProcessEnv::new()));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(MemoryBackupSink::new()));

        let settings = Arc::new(SettingsBackedStore::new(
            self.doc,
            self.cipher,
            logger.clone(),
        ));
        let environment = Arc::new(EnvironmentBackedStore::new(env, logger.clone()));
        let router = Arc::new(StrategyRouter::new(
            settings.clone(),
            environment.clone(),
            logger.clone(),
        ));

        let mut engine = MigrationEngine::new(router.clone(), sink, logger);
        if let Some(check) = self.connectivity {
            engine = engine.with_connectivity(check);
        }

        CredentialContext {
            settings,
            environment,
            router,
            engine: Arc::new(engine),
        }
    }
}
