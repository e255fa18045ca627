//! Configuration management for the ledger

use crate::core::{BlockMode, DEFAULT_DIFFICULTY};
use crate::crypto::MAX_DIFFICULTY;
use crate::mining::Miner;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex characters required of a block hash
    pub difficulty: u32,
    /// How blocks commit to their transactions
    pub block_mode: BlockMode,
    /// Nonce search threads, 1 mines on the calling thread
    pub mining_threads: usize,
    /// Give up mining after this many nonces
    pub max_mining_attempts: Option<u64>,
    /// Give up each key generation sampling loop after this many draws
    pub max_keygen_attempts: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            block_mode: BlockMode::Merkle,
            mining_threads: 1,
            max_mining_attempts: None,
            max_keygen_attempts: None,
        }
    }
}

impl LedgerConfig {
    /// Read configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: LedgerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate critical values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mining_threads == 0 {
            return Err(ConfigError::InvalidValue(
                "mining_threads must be at least 1".to_string(),
            ));
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidValue(format!(
                "difficulty {} exceeds the {} hex characters of a hash",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(())
    }

    /// Build the miner described by this configuration
    pub fn miner(&self) -> Miner {
        Miner::new()
            .with_threads(self.mining_threads)
            .with_max_attempts(self.max_mining_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::load(None).unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.block_mode, BlockMode::Merkle);
        assert_eq!(config.mining_threads, 1);
        assert!(config.max_mining_attempts.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_with_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty = 3").unwrap();
        writeln!(file, "block_mode = \"flat\"").unwrap();
        writeln!(file, "max_mining_attempts = 1000").unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.difficulty, 3);
        assert_eq!(config.block_mode, BlockMode::Flat);
        assert_eq!(config.max_mining_attempts, Some(1000));
        assert_eq!(config.mining_threads, 1);

        let miner = config.miner();
        assert_eq!(miner.max_attempts, Some(1000));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mining_threads = 0").unwrap();
        assert!(matches!(
            LedgerConfig::from_file(file.path()),
            Err(ConfigError::InvalidValue(_))
        ));

        let config = LedgerConfig {
            difficulty: 65,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty = \"high\"").unwrap();
        assert!(matches!(
            LedgerConfig::from_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = LedgerConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
