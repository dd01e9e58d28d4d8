// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message store configuration.
//!
//! The strategy is a configuration-time choice: it is resolved once by
//! [`StrategyRegistry::from_config`](crate::StrategyRegistry::from_config)
//! before the first superstep and never changes afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shard::DEFAULT_SHARDS;
use crate::store::StoreOptions;
use crate::strategy::SIMPLE_MESSAGE_STORE;

/// Error type for config parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON or unknown keys.
    #[error("serde error: {0}")]
    Json(#[from] serde_json::Error),
    /// Shard count is not a power of two in `1..=MAX_SHARDS`.
    #[error("invalid shard count {0}: must be a power of two between 1 and 4096")]
    InvalidShardCount(usize),
}

/// Declarative store configuration.
///
/// ```json
/// { "strategy": "POINTER_MESSAGE_STORE", "shards": 128, "initial_capacity": 1024 }
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageStoreConfig {
    /// Registry name of the encode-and-store strategy.
    pub strategy: String,
    /// Index shard count.
    pub shards: usize,
    /// Per-shard destination capacity reserved when a store opens.
    pub initial_capacity: usize,
}

impl Default for MessageStoreConfig {
    fn default() -> Self {
        Self {
            strategy: SIMPLE_MESSAGE_STORE.to_owned(),
            shards: DEFAULT_SHARDS,
            initial_capacity: 0,
        }
    }
}

impl MessageStoreConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes)?;
        config.options()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Store sizing derived from this config.
    pub fn options(&self) -> Result<StoreOptions, ConfigError> {
        StoreOptions::new(self.shards, self.initial_capacity)
            .ok_or(ConfigError::InvalidShardCount(self.shards))
    }
}
