// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message payloads and the codec boundary for typed message values.
//!
//! The store is byte-blind: a payload is an opaque [`Bytes`] buffer plus an
//! optional [`TypeId`] when the message carries a typed graph element.
//! `Bytes` is reference counted, so handing the same payload to many
//! destinations shares one allocation.

use bsp_schema::TypeId;
use bytes::Bytes;
use thiserror::Error;

/// Encoded message body, optionally tagged with the graph element type it
/// represents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessagePayload {
    /// Element type carried by `bytes`, when the payload is a typed element.
    pub type_id: Option<TypeId>,
    /// Opaque serialized body.
    pub bytes: Bytes,
}

impl MessagePayload {
    /// Untyped payload.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            type_id: None,
            bytes: bytes.into(),
        }
    }

    /// Payload tagged with the element type it encodes.
    #[must_use]
    pub fn typed(type_id: TypeId, bytes: impl Into<Bytes>) -> Self {
        Self {
            type_id: Some(type_id),
            bytes: bytes.into(),
        }
    }

    /// Serialized size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `true` when both payloads view the same underlying buffer (same data
    /// pointer and length), i.e. no copy of the bytes was made.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.bytes.len() == other.bytes.len() && self.bytes.as_ptr() == other.bytes.as_ptr()
    }

    /// Decodes the payload as `T` using codec `C`.
    ///
    /// # Errors
    /// Returns [`DecodeError::TypeMismatch`] when the payload tag differs from
    /// `C::TYPE_ID`, or forwards the codec's decode error.
    pub fn decode_with<C, T>(&self) -> Result<T, DecodeError>
    where
        C: PayloadCodec<T>,
    {
        if self.type_id != C::TYPE_ID {
            return Err(DecodeError::TypeMismatch {
                expected: C::TYPE_ID,
                found: self.type_id,
            });
        }
        C::decode(&self.bytes)
    }
}

impl From<Bytes> for MessagePayload {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for MessagePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&'static str> for MessagePayload {
    fn from(text: &'static str) -> Self {
        Self::new(Bytes::from_static(text.as_bytes()))
    }
}

/// Error returned by strict payload decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload tag did not match the codec's type id.
    #[error("payload type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Tag the codec expects.
        expected: Option<TypeId>,
        /// Tag found on the payload.
        found: Option<TypeId>,
    },
    /// The byte content was invalid for the expected type.
    #[error("invalid payload bytes")]
    InvalidBytes,
}

/// Serialization boundary between message values and payload bytes.
///
/// Contract:
/// - `encode` is called once per logical message, even for broadcasts.
/// - `decode` either returns the value or a [`DecodeError`]; it must not
///   consult ambient state.
pub trait PayloadCodec<T> {
    /// Tag written into payloads produced by this codec (`None` for plain
    /// messages that are not graph elements).
    const TYPE_ID: Option<TypeId>;

    /// Serializes `value`.
    fn encode(value: &T) -> Bytes;

    /// Deserializes `bytes`.
    ///
    /// # Errors
    /// Returns an error if `bytes` is not a valid encoding of `T`.
    fn decode(bytes: &Bytes) -> Result<T, DecodeError>;
}

/// Codec for the common `f64` message (PageRank, SSSP distances).
#[derive(Debug, Clone, Copy, Default)]
pub struct F64Codec;

impl PayloadCodec<f64> for F64Codec {
    const TYPE_ID: Option<TypeId> = None;

    fn encode(value: &f64) -> Bytes {
        Bytes::copy_from_slice(&value.to_le_bytes())
    }

    fn decode(bytes: &Bytes) -> Result<f64, DecodeError> {
        let raw: [u8; 8] = bytes
            .as_ref()
            .try_into()
            .map_err(|_| DecodeError::InvalidBytes)?;
        Ok(f64::from_le_bytes(raw))
    }
}

/// Codec for `i64` messages (label propagation, component ids).
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

impl PayloadCodec<i64> for I64Codec {
    const TYPE_ID: Option<TypeId> = None;

    fn encode(value: &i64) -> Bytes {
        Bytes::copy_from_slice(&value.to_le_bytes())
    }

    fn decode(bytes: &Bytes) -> Result<i64, DecodeError> {
        let raw: [u8; 8] = bytes
            .as_ref()
            .try_into()
            .map_err(|_| DecodeError::InvalidBytes)?;
        Ok(i64::from_le_bytes(raw))
    }
}
