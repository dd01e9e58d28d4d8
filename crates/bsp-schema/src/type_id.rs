// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact type identifiers for graph elements.

use std::fmt;

use crate::wire::{self, CodecError};

const VERTEX_CODE: i32 = 0;
const EDGE_CODE: i32 = 1;

/// Category of a graph element.
///
/// Wire codes are stable and independent of declaration order:
/// `0 = Vertex`, `1 = Edge`. Any other code decodes to
/// [`ElementKind::Unrecognized`], which keeps the raw value so the identifier
/// can be forwarded unchanged by a peer that does not understand it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    /// Vertex (node) element.
    #[default]
    Vertex,
    /// Edge element.
    Edge,
    /// Wire code this build does not know about.
    Unrecognized(i32),
}

impl ElementKind {
    /// Stable wire code of this kind.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Vertex => VERTEX_CODE,
            Self::Edge => EDGE_CODE,
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Maps a wire code to a kind. Never fails.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            VERTEX_CODE => Self::Vertex,
            EDGE_CODE => Self::Edge,
            other => Self::Unrecognized(other),
        }
    }

    /// `false` only for [`ElementKind::Unrecognized`].
    #[must_use]
    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

/// Identifier of a vertex or edge label: a numeric subtype plus its category.
///
/// Equality, ordering and hashing are structural, so `TypeId` can key schema
/// and handler tables directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeId {
    /// Element-local subtype (which vertex or edge label).
    pub id: u32,
    /// Element category.
    pub kind: ElementKind,
}

impl TypeId {
    /// Constructs a vertex type identifier.
    #[must_use]
    pub const fn vertex(id: u32) -> Self {
        Self {
            id,
            kind: ElementKind::Vertex,
        }
    }

    /// Constructs an edge type identifier.
    #[must_use]
    pub const fn edge(id: u32) -> Self {
        Self {
            id,
            kind: ElementKind::Edge,
        }
    }

    /// Two-field wire form `(id, category_code)`.
    #[must_use]
    pub const fn encode(self) -> (u32, i32) {
        (self.id, self.kind.code())
    }

    /// Inverse of [`TypeId::encode`]. Unknown category codes yield
    /// [`ElementKind::Unrecognized`] instead of an error; strict callers check
    /// [`TypeId::is_recognized`].
    #[must_use]
    pub const fn decode(id: u32, category_code: i32) -> Self {
        Self {
            id,
            kind: ElementKind::from_code(category_code),
        }
    }

    /// Whether the category is one this build understands.
    #[must_use]
    pub const fn is_recognized(self) -> bool {
        self.kind.is_recognized()
    }

    /// Encodes as a protobuf `TypeIdProto { uint32 id = 1; enum type = 2; }`.
    ///
    /// Zero-valued fields are omitted, so `vertex(0)` encodes to an empty buffer.
    #[must_use]
    pub fn to_wire_bytes(self) -> Vec<u8> {
        wire::encode(self)
    }

    /// Decodes a protobuf `TypeIdProto`.
    ///
    /// Absent fields keep their zero value (`id = 0`, `Vertex`); unknown
    /// fields are skipped; when a field repeats, the last value wins.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        wire::decode(bytes)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ElementKind::Vertex => write!(f, "vertex:{}", self.id),
            ElementKind::Edge => write!(f, "edge:{}", self.id),
            ElementKind::Unrecognized(raw) => write!(f, "unrecognized({raw}):{}", self.id),
        }
    }
}

impl From<TypeId> for (u32, i32) {
    fn from(value: TypeId) -> Self {
        value.encode()
    }
}
