// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message records accepted by the store.

use std::sync::Arc;

use crate::payload::MessagePayload;

/// One payload addressed to one destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord<I> {
    /// Destination vertex.
    pub destination: I,
    /// Encoded body.
    pub payload: MessagePayload,
}

impl<I> MessageRecord<I> {
    /// Creates a record.
    #[must_use]
    pub fn new(destination: I, payload: MessagePayload) -> Self {
        Self {
            destination,
            payload,
        }
    }
}

/// One payload addressed to a set of destinations.
///
/// Only [`MessageEncoder::encode_broadcast`](crate::MessageEncoder::encode_broadcast)
/// constructs these, which guarantees the destination list is duplicate free
/// and that the strategy allows shared payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastRecord<I> {
    destinations: Arc<[I]>,
    payload: MessagePayload,
}

impl<I> BroadcastRecord<I> {
    pub(crate) fn new(destinations: Arc<[I]>, payload: MessagePayload) -> Self {
        Self {
            destinations,
            payload,
        }
    }

    /// Destination set, in first-seen order.
    #[must_use]
    pub fn destinations(&self) -> &[I] {
        &self.destinations
    }

    /// Shared body.
    #[must_use]
    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> (Arc<[I]>, MessagePayload) {
        (self.destinations, self.payload)
    }
}

/// Anything [`MessageStore::add`](crate::MessageStore::add) accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record<I> {
    /// Single-destination message.
    Single(MessageRecord<I>),
    /// Shared payload for many destinations.
    Broadcast(BroadcastRecord<I>),
}

impl<I> From<MessageRecord<I>> for Record<I> {
    fn from(value: MessageRecord<I>) -> Self {
        Self::Single(value)
    }
}

impl<I> From<BroadcastRecord<I>> for Record<I> {
    fn from(value: BroadcastRecord<I>) -> Self {
        Self::Broadcast(value)
    }
}
