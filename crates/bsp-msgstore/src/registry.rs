// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Strategy registry: resolves a configured strategy name to an
//! encoder/store-builder pair.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, MessageStoreConfig};
use crate::encoder::MessageEncoder;
use crate::store::{StoreBuilder, StoreOptions};
use crate::strategy::{PointerMessageStore, SimpleMessageStore, StrategyFactory};

/// Errors returned by the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No strategy is registered under the requested name.
    #[error("unknown message encode-and-store strategy: {0}")]
    UnknownStrategy(String),
    /// A strategy with the same name is already registered.
    #[error("duplicate strategy registration: {0}")]
    DuplicateStrategy(String),
    /// The configuration could not be turned into store options.
    #[error("invalid message store config: {0}")]
    Config(#[from] ConfigError),
}

/// Open set of encode-and-store strategies keyed by name.
///
/// Call sites depend only on [`MessageEncoder`] and [`StoreBuilder`]; adding
/// a strategy means registering another [`StrategyFactory`].
#[derive(Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<&'static str, Box<dyn StrategyFactory>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `SIMPLE_MESSAGE_STORE` and `POINTER_MESSAGE_STORE`.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut factories: BTreeMap<&'static str, Box<dyn StrategyFactory>> = BTreeMap::new();
        for factory in [
            Box::new(SimpleMessageStore) as Box<dyn StrategyFactory>,
            Box::new(PointerMessageStore),
        ] {
            factories.insert(factory.descriptor().name(), factory);
        }
        Self { factories }
    }

    /// Registers a strategy factory.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateStrategy`] if the name is taken.
    pub fn register(&mut self, factory: Box<dyn StrategyFactory>) -> Result<(), RegistryError> {
        let name = factory.descriptor().name();
        if self.factories.contains_key(name) {
            return Err(RegistryError::DuplicateStrategy(name.to_owned()));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Registered strategy names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the encoder/store pair for `name` with default sizing.
    ///
    /// # Errors
    /// [`RegistryError::UnknownStrategy`] for unregistered names.
    pub fn create(&self, name: &str) -> Result<(MessageEncoder, StoreBuilder), RegistryError> {
        self.create_with(name, StoreOptions::default())
    }

    /// Builds the encoder/store pair for `name` with explicit sizing.
    ///
    /// # Errors
    /// [`RegistryError::UnknownStrategy`] for unregistered names.
    pub fn create_with(
        &self,
        name: &str,
        options: StoreOptions,
    ) -> Result<(MessageEncoder, StoreBuilder), RegistryError> {
        let Some(factory) = self.factories.get(name) else {
            warn!(strategy = name, "unknown message store strategy");
            return Err(RegistryError::UnknownStrategy(name.to_owned()));
        };
        debug!(
            strategy = name,
            shards = options.shards(),
            "message store strategy selected"
        );
        Ok(factory.create(options))
    }

    /// Resolves the strategy and sizing named by `config`.
    ///
    /// # Errors
    /// [`RegistryError::Config`] for invalid sizing,
    /// [`RegistryError::UnknownStrategy`] for unregistered names.
    pub fn from_config(
        &self,
        config: &MessageStoreConfig,
    ) -> Result<(MessageEncoder, StoreBuilder), RegistryError> {
        let options = config.options()?;
        self.create_with(&config.strategy, options)
    }
}
