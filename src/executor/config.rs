//! Scan configuration
//!
//! Loaded from JSON; every field has a default so an empty object is valid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid JSON for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Index scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Rows requested from the upstream block per fetch (default: 1000)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Merge adjacent overlapping branches into one scan (default: true)
    #[serde(default = "default_merge_adjacent_branches")]
    pub merge_adjacent_branches: bool,

    /// Never emit a document twice per outer row (default: false)
    #[serde(default)]
    pub full_deduplication: bool,

    /// Log per-branch trace events (default: false)
    #[serde(default)]
    pub trace_branches: bool,
}

fn default_batch_size() -> usize {
    super::block::DEFAULT_BATCH_SIZE
}

fn default_merge_adjacent_branches() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            merge_adjacent_branches: default_merge_adjacent_branches(),
            full_deduplication: false,
            trace_branches: false,
        }
    }
}

impl ScanConfig {
    /// Parses and validates a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Rejects out-of-range values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Config with full deduplication enabled
    pub fn with_full_deduplication(mut self) -> Self {
        self.full_deduplication = true;
        self
    }

    /// Config with adjacent-branch merging disabled
    pub fn without_merging(mut self) -> Self {
        self.merge_adjacent_branches = false;
        self
    }

    /// Config with the given upstream batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}
