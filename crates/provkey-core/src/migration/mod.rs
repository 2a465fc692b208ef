//! Credential migration between stores
//!
//! Moves one provider's credential from its legacy store to its target
//! store, safely: detect → backup → transfer → verify → cleanup, with a
//! point-in-time backup as the manual rollback path.

mod backup;
mod engine;

pub use backup::{BackupError, BackupResult, BackupSink, MemoryBackupSink, MigrationBackup};
pub use engine::{
    ConnectivityCheck, HttpConnectivityCheck, MigrationEngine, MigrationOutcome,
    MigrationRequest, MigrationState, MigrationStep, MigrationStepError,
};
