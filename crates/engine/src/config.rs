// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration engine configuration

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Tunables for one migrator instance.
///
/// Durations are expressed in milliseconds in config files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Alias name of the logical collection (physical indices are
    /// `<collection>_<generation>`)
    pub collection: String,
    /// Documents fetched per reindex batch
    pub batch_size: usize,
    /// Per-document transform failures tolerated before the run aborts
    pub failure_threshold: u32,
    /// Retry attempts for transient store errors
    pub max_retries: u32,
    /// First retry delay; doubles per attempt
    #[serde(rename = "retry_base_delay_ms", with = "duration_ms")]
    pub retry_base_delay: Duration,
    /// Interval between polls while another process holds the lock
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    /// Polls tolerated before giving up on the lock holder
    pub poll_budget: u32,
    /// Lease lifetime; renewed at a third of this interval
    #[serde(rename = "lease_ttl_ms", with = "duration_ms")]
    pub lease_ttl: Duration,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            collection: ".saved-objects".to_string(),
            batch_size: 100,
            failure_threshold: 0,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(250),
            poll_budget: 120,
            lease_ttl: Duration::from_secs(30),
        }
    }
}

impl MigrationConfig {
    /// A config for the given collection with default tunables
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Parse from TOML, filling unset fields with defaults
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Name of the lock marker guarding this collection
    pub fn lock_name(&self) -> String {
        format!("{}_migration_lock", self.collection)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
