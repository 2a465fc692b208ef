//! Migration backups and the durable sink they are written to

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::unix_now_millis;

/// Timestamp key for a new backup: current epoch milliseconds, bumped past
/// the previous key so two captures in the same millisecond never collide.
fn next_backup_key() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);
    let now = unix_now_millis();
    let prev = LAST
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(0);
    now.max(prev + 1)
}

/// An immutable point-in-time capture taken before any destructive
/// migration step
///
/// Holds the legacy secret (when one existed) and a snapshot of the related
/// settings entries, raw and still encrypted. Used for manual restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationBackup {
    /// Milliseconds since the Unix epoch; also the sink key, unique within
    /// a process
    pub timestamp: u64,
    /// The legacy secret at capture time, if any
    pub captured_secret: Option<String>,
    /// Raw settings entries (encrypted envelopes) at capture time
    pub settings_snapshot: HashMap<String, Value>,
}

impl MigrationBackup {
    /// Capture a backup timestamped now
    pub fn capture(
        captured_secret: Option<String>,
        settings_snapshot: HashMap<String, Value>,
    ) -> Self {
        Self {
            timestamp: next_backup_key(),
            captured_secret,
            settings_snapshot,
        }
    }
}

/// Errors from the backup sink
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backup sink error: {0}")]
    Other(String),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// A durable key/value store for backup records, keyed by timestamp
///
/// This crate only constructs and reads the records; the storage medium is
/// owned by the caller.
pub trait BackupSink: Send + Sync {
    /// Persist a backup record
    fn save(&self, backup: &MigrationBackup) -> BackupResult<()>;

    /// Load a backup record by timestamp key
    fn load(&self, timestamp: u64) -> BackupResult<Option<MigrationBackup>>;

    /// The most recent backup record, if any
    fn latest(&self) -> BackupResult<Option<MigrationBackup>>;
}

/// In-memory backup sink for testing
#[derive(Debug, Default)]
pub struct MemoryBackupSink {
    backups: RwLock<BTreeMap<u64, MigrationBackup>>,
}

impl MemoryBackupSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored backups
    pub fn len(&self) -> usize {
        self.backups.read().len()
    }

    /// Check if the sink is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackupSink for MemoryBackupSink {
    fn save(&self, backup: &MigrationBackup) -> BackupResult<()> {
        self.backups.write().insert(backup.timestamp, backup.clone());
        Ok(())
    }

    fn load(&self, timestamp: u64) -> BackupResult<Option<MigrationBackup>> {
        Ok(self.backups.read().get(&timestamp).cloned())
    }

    fn latest(&self) -> BackupResult<Option<MigrationBackup>> {
        Ok(self.backups.read().values().next_back().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_sink_round_trip() {
        let sink = MemoryBackupSink::new();
        assert!(sink.is_empty());
        assert!(sink.latest().unwrap().is_none());

        let mut snapshot = HashMap::new();
        snapshot.insert("credentials.zai".to_string(), json!("envelope"));
        let backup = MigrationBackup::capture(Some("zai-abc1234567".to_string()), snapshot);

        sink.save(&backup).unwrap();
        assert_eq!(sink.load(backup.timestamp).unwrap(), Some(backup.clone()));
        assert_eq!(sink.latest().unwrap(), Some(backup));
    }

    #[test]
    fn test_rapid_captures_get_distinct_keys() {
        let sink = MemoryBackupSink::new();
        for _ in 0..10 {
            sink.save(&MigrationBackup::capture(None, HashMap::new())).unwrap();
        }
        // Even captures within the same millisecond keep their own key
        assert_eq!(sink.len(), 10);
    }

    #[test]
    fn test_latest_picks_newest() {
        let sink = MemoryBackupSink::new();

        let older = MigrationBackup {
            timestamp: 100,
            captured_secret: None,
            settings_snapshot: HashMap::new(),
        };
        let newer = MigrationBackup {
            timestamp: 200,
            captured_secret: Some("s".to_string()),
            settings_snapshot: HashMap::new(),
        };

        sink.save(&newer).unwrap();
        sink.save(&older).unwrap();
        assert_eq!(sink.latest().unwrap().unwrap().timestamp, 200);
    }

    #[test]
    fn test_backup_serializes() {
        let backup = MigrationBackup {
            timestamp: 42,
            captured_secret: Some("secret".to_string()),
            settings_snapshot: HashMap::new(),
        };

        let json = serde_json::to_string(&backup).unwrap();
        let parsed: MigrationBackup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, backup);
    }
}
