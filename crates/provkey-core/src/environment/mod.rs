//! Process environment abstraction
//!
//! The environment-backed store never touches ambient process state
//! directly; it goes through an injected `EnvTable` so tests can substitute
//! an in-memory fake.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

/// Errors writing to an environment table
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("invalid environment variable name: {0}")]
    InvalidName(String),

    #[error("environment error: {0}")]
    Other(String),
}

pub type EnvResult<T> = Result<T, EnvError>;

/// A name → value table of environment variables
pub trait EnvTable: Send + Sync {
    /// Read a variable; empty values read as absent
    fn get(&self, name: &str) -> Option<String>;

    /// Assign a variable
    fn set(&self, name: &str, value: &str) -> EnvResult<()>;

    /// Remove a variable
    fn remove(&self, name: &str) -> EnvResult<()>;
}

/// The real process environment
///
/// Changes are visible only to the running process and are lost on restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }

    fn check_name(name: &str) -> EnvResult<()> {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(EnvError::InvalidName(name.to_string()));
        }
        Ok(())
    }
}

impl EnvTable for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn set(&self, name: &str, value: &str) -> EnvResult<()> {
        Self::check_name(name)?;
        std::env::set_var(name, value);
        Ok(())
    }

    fn remove(&self, name: &str) -> EnvResult<()> {
        Self::check_name(name)?;
        std::env::remove_var(name);
        Ok(())
    }
}

/// In-memory environment table for testing
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnv {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with initial variables
    pub fn with_vars(initial: HashMap<String, String>) -> Self {
        Self {
            vars: RwLock::new(initial),
        }
    }

    /// Number of variables currently set
    pub fn len(&self) -> usize {
        self.vars.read().len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EnvTable for MemoryEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.read().get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn set(&self, name: &str, value: &str) -> EnvResult<()> {
        self.vars.write().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> EnvResult<()> {
        self.vars.write().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_env_crud() {
        let env = MemoryEnv::new();
        assert!(env.is_empty());

        env.set("ANTHROPIC_AUTH_TOKEN", "zai-abc1234567").unwrap();
        assert_eq!(env.get("ANTHROPIC_AUTH_TOKEN"), Some("zai-abc1234567".to_string()));
        assert_eq!(env.len(), 1);

        env.remove("ANTHROPIC_AUTH_TOKEN").unwrap();
        assert_eq!(env.get("ANTHROPIC_AUTH_TOKEN"), None);
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let env = MemoryEnv::new();
        env.set("EMPTY_VAR", "").unwrap();
        assert_eq!(env.get("EMPTY_VAR"), None);
    }

    #[test]
    fn test_process_env_rejects_bad_names() {
        let env = ProcessEnv::new();
        assert!(matches!(env.set("", "v"), Err(EnvError::InvalidName(_))));
        assert!(matches!(env.set("A=B", "v"), Err(EnvError::InvalidName(_))));
    }

    #[test]
    fn test_process_env_round_trip() {
        let env = ProcessEnv::new();
        env.set("PROVKEY_TEST_VAR_XYZ", "value").unwrap();
        assert_eq!(env.get("PROVKEY_TEST_VAR_XYZ"), Some("value".to_string()));

        env.remove("PROVKEY_TEST_VAR_XYZ").unwrap();
        assert_eq!(env.get("PROVKEY_TEST_VAR_XYZ"), None);
    }
}
