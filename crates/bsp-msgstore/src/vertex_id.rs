// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Destination identifiers.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Bound satisfied by every type usable as a message destination.
///
/// The store never interprets destinations; it only hashes them to pick a
/// shard and compares them to group messages. Any id type the partitioning
/// layer hands out qualifies through the blanket impl.
pub trait DestinationKey: Hash + Eq + Clone + Send + Sync + fmt::Debug + 'static {}

impl<T> DestinationKey for T where T: Hash + Eq + Clone + Send + Sync + fmt::Debug + 'static {}

/// Vertex identifier covering the id shapes produced by graph loaders.
///
/// Cloning is cheap for every variant (`Text` and `Composite` are
/// reference counted).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum VertexId {
    /// Integer id (the common case for dense, loader-assigned ids).
    Long(i64),
    /// String id (external primary keys).
    Text(Arc<str>),
    /// Multi-part key, e.g. `(label, primary key)`.
    Composite(Arc<[VertexId]>),
}

impl VertexId {
    /// Builds a composite id from its parts.
    #[must_use]
    pub fn composite(parts: impl IntoIterator<Item = VertexId>) -> Self {
        Self::Composite(parts.into_iter().collect())
    }

    /// Returns the integer id, if this is a [`VertexId::Long`].
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for VertexId {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<&str> for VertexId {
    fn from(value: &str) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<String> for VertexId {
    fn from(value: String) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Composite(parts) => {
                f.write_str("(")?;
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}
