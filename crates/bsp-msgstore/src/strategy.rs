// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Encode-and-store strategies.
//!
//! A strategy decides how outgoing messages are represented before they are
//! shipped. Strategies form an open set: each one is a [`StrategyFactory`]
//! registered by name in the [`StrategyRegistry`](crate::StrategyRegistry).
//! Call sites only see the resulting [`MessageEncoder`] and [`StoreBuilder`].

use std::fmt;

use crate::encoder::MessageEncoder;
use crate::store::{StoreBuilder, StoreOptions};

/// Name of the byte-array strategy (one payload per destination).
pub const SIMPLE_MESSAGE_STORE: &str = "SIMPLE_MESSAGE_STORE";

/// Name of the pointer strategy (one payload shared by many destinations).
pub const POINTER_MESSAGE_STORE: &str = "POINTER_MESSAGE_STORE";

/// Static description of a strategy.
///
/// `one_message_to_many_ids` fixes the store layout for the lifetime of every
/// store built from this descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyDescriptor {
    name: &'static str,
    one_message_to_many_ids: bool,
}

impl StrategyDescriptor {
    /// Describes a strategy.
    #[must_use]
    pub const fn new(name: &'static str, one_message_to_many_ids: bool) -> Self {
        Self {
            name,
            one_message_to_many_ids,
        }
    }

    /// Registry name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether one serialized message may be addressed to many ids.
    #[must_use]
    pub const fn uses_one_message_to_many_ids_encoding(&self) -> bool {
        self.one_message_to_many_ids
    }

    /// Index layout a store built for this strategy uses.
    #[must_use]
    pub const fn layout(&self) -> StoreLayout {
        if self.one_message_to_many_ids {
            StoreLayout::Grouped
        } else {
            StoreLayout::Flat
        }
    }
}

impl fmt::Display for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Internal indexing of a message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreLayout {
    /// Per-destination queues of independent `(id, payload)` messages.
    Flat,
    /// Per-destination queues plus `(payload, id-set)` groups for shared
    /// payloads.
    Grouped,
}

/// `SIMPLE_MESSAGE_STORE` descriptor.
pub const SIMPLE: StrategyDescriptor = StrategyDescriptor::new(SIMPLE_MESSAGE_STORE, false);

/// `POINTER_MESSAGE_STORE` descriptor.
pub const POINTER: StrategyDescriptor = StrategyDescriptor::new(POINTER_MESSAGE_STORE, true);

/// Builds the encoder/store pair for one strategy.
///
/// Implementors usually only provide [`StrategyFactory::descriptor`]; the
/// default [`StrategyFactory::create`] wires the stock encoder and builder.
pub trait StrategyFactory: Send + Sync {
    /// Descriptor of the strategy this factory builds.
    fn descriptor(&self) -> StrategyDescriptor;

    /// Creates the encoder and store builder.
    fn create(&self, options: StoreOptions) -> (MessageEncoder, StoreBuilder) {
        let descriptor = self.descriptor();
        (
            MessageEncoder::new(descriptor),
            StoreBuilder::new(descriptor, options),
        )
    }
}

/// Factory for [`SIMPLE_MESSAGE_STORE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMessageStore;

impl StrategyFactory for SimpleMessageStore {
    fn descriptor(&self) -> StrategyDescriptor {
        SIMPLE
    }
}

/// Factory for [`POINTER_MESSAGE_STORE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerMessageStore;

impl StrategyFactory for PointerMessageStore {
    fn descriptor(&self) -> StrategyDescriptor {
        POINTER
    }
}
