// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Protobuf wire form of [`TypeId`](crate::TypeId).
//!
//! ```text
//! message TypeIdProto {
//!   uint32   id   = 1;
//!   TypeEnum type = 2;   // VERTEX = 0, EDGE = 1
//! }
//! ```
//!
//! The enum field is carried as a raw `int32` so codes this build does not
//! know survive a decode/encode round trip.

use prost::Message;
use thiserror::Error;

use crate::type_id::TypeId;

/// Error returned when a buffer is not a valid `TypeIdProto`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Truncated input, malformed varint or invalid tag.
    #[error("malformed TypeIdProto: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Generated-code shape of `TypeIdProto`.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct TypeIdProto {
    /// Element-local subtype.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Category code (`TypeEnum`).
    #[prost(int32, tag = "2")]
    pub r#type: i32,
}

impl From<TypeId> for TypeIdProto {
    fn from(value: TypeId) -> Self {
        let (id, r#type) = value.encode();
        Self { id, r#type }
    }
}

impl From<TypeIdProto> for TypeId {
    fn from(value: TypeIdProto) -> Self {
        Self::decode(value.id, value.r#type)
    }
}

pub(crate) fn encode(type_id: TypeId) -> Vec<u8> {
    TypeIdProto::from(type_id).encode_to_vec()
}

pub(crate) fn decode(bytes: &[u8]) -> Result<TypeId, CodecError> {
    Ok(TypeIdProto::decode(bytes)?.into())
}
