// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message encoder: turns application payloads into store records.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::payload::{MessagePayload, PayloadCodec};
use crate::record::{BroadcastRecord, MessageRecord};
use crate::strategy::StrategyDescriptor;
use crate::vertex_id::DestinationKey;

/// Errors returned by the encoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Broadcast requested under a strategy without shared payloads.
    #[error("strategy {strategy} does not support one-message-to-many-ids encoding")]
    UnsupportedStrategy {
        /// Strategy the encoder was built for.
        strategy: &'static str,
    },
}

/// Stateless encoder bound to one strategy.
///
/// `Copy` and free of interior state, so every worker thread can hold its
/// own copy and encode without synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageEncoder {
    strategy: StrategyDescriptor,
}

impl MessageEncoder {
    /// Encoder for `strategy`.
    #[must_use]
    pub const fn new(strategy: StrategyDescriptor) -> Self {
        Self { strategy }
    }

    /// Strategy this encoder applies.
    #[must_use]
    pub const fn strategy(&self) -> StrategyDescriptor {
        self.strategy
    }

    /// Wraps an encoded payload with its destination. Valid under every
    /// strategy.
    pub fn encode_single<I>(
        &self,
        destination: I,
        payload: impl Into<MessagePayload>,
    ) -> MessageRecord<I> {
        MessageRecord::new(destination, payload.into())
    }

    /// Serializes `value` through codec `C` and addresses it to `destination`.
    pub fn encode_value<C, T, I>(&self, destination: I, value: &T) -> MessageRecord<I>
    where
        C: PayloadCodec<T>,
    {
        self.encode_single(destination, codec_payload::<C, T>(value))
    }

    /// Associates one payload with a set of destinations.
    ///
    /// Duplicate ids are dropped, keeping first-occurrence order, so each
    /// destination receives the payload once.
    ///
    /// # Errors
    /// [`EncodeError::UnsupportedStrategy`] unless the strategy uses
    /// one-message-to-many-ids encoding.
    pub fn encode_broadcast<I>(
        &self,
        destinations: impl IntoIterator<Item = I>,
        payload: impl Into<MessagePayload>,
    ) -> Result<BroadcastRecord<I>, EncodeError>
    where
        I: DestinationKey,
    {
        self.ensure_sharing()?;
        let mut seen = FxHashSet::default();
        let unique: Vec<I> = destinations
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Ok(BroadcastRecord::new(unique.into(), payload.into()))
    }

    /// Serializes `value` once through codec `C` and shares it across
    /// `destinations`.
    ///
    /// # Errors
    /// Same as [`MessageEncoder::encode_broadcast`]. The strategy is checked
    /// before serializing.
    pub fn encode_broadcast_value<C, T, I>(
        &self,
        destinations: impl IntoIterator<Item = I>,
        value: &T,
    ) -> Result<BroadcastRecord<I>, EncodeError>
    where
        C: PayloadCodec<T>,
        I: DestinationKey,
    {
        self.ensure_sharing()?;
        self.encode_broadcast(destinations, codec_payload::<C, T>(value))
    }

    fn ensure_sharing(&self) -> Result<(), EncodeError> {
        if self.strategy.uses_one_message_to_many_ids_encoding() {
            Ok(())
        } else {
            Err(EncodeError::UnsupportedStrategy {
                strategy: self.strategy.name(),
            })
        }
    }
}

fn codec_payload<C, T>(value: &T) -> MessagePayload
where
    C: PayloadCodec<T>,
{
    MessagePayload {
        type_id: C::TYPE_ID,
        bytes: C::encode(value),
    }
}
