// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! bsp-msgstore: inter-worker message storage for vertex-centric BSP
//! computation.
//!
//! During superstep `n` every compute thread pushes outgoing messages into a
//! [`MessageStore`]; at the barrier the store is sealed and the destination
//! vertices drain their messages for superstep `n + 1`. The encode-and-store
//! strategy is chosen once from configuration through the
//! [`StrategyRegistry`]:
//!
//! - `SIMPLE_MESSAGE_STORE`: one payload per destination.
//! - `POINTER_MESSAGE_STORE`: one payload shared by many destinations
//!   (broadcast without copying the bytes).
//!
//! ```
//! use bsp_msgstore::{MessageStoreConfig, StrategyRegistry, VertexId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MessageStoreConfig::from_json_slice(br#"{"strategy":"POINTER_MESSAGE_STORE"}"#)?;
//! let (encoder, builder) = StrategyRegistry::with_builtin().from_config(&config)?;
//! let store = builder.open::<VertexId>(0)?;
//!
//! store.add(encoder.encode_single(VertexId::Long(1), "hello"))?;
//! store.add(encoder.encode_broadcast([VertexId::Long(2), VertexId::Long(3)], "hi all")?)?;
//! store.seal();
//!
//! assert_eq!(store.drain_for(&VertexId::Long(3))?.len(), 1);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod config;
mod encoder;
mod payload;
mod record;
mod registry;
pub mod shard;
mod store;
mod strategy;
mod vertex_id;

/// Declarative store configuration.
pub use config::{ConfigError, MessageStoreConfig};
/// Payload-to-record encoding.
pub use encoder::{EncodeError, MessageEncoder};
/// Payload bodies and typed codecs.
pub use payload::{DecodeError, F64Codec, I64Codec, MessagePayload, PayloadCodec};
/// Records accepted by [`MessageStore::add`].
pub use record::{BroadcastRecord, MessageRecord, Record};
/// Strategy lookup by name.
pub use registry::{RegistryError, StrategyRegistry};
/// Per-superstep store and its builder.
pub use store::{
    MessageStore, SharedGroup, StoreBuilder, StoreError, StoreOptions, StoreStats,
};
/// Strategy descriptors and factories.
pub use strategy::{
    PointerMessageStore, SimpleMessageStore, StoreLayout, StrategyDescriptor, StrategyFactory,
    POINTER, POINTER_MESSAGE_STORE, SIMPLE, SIMPLE_MESSAGE_STORE,
};
/// Destination identifiers.
pub use vertex_id::{DestinationKey, VertexId};

/// Re-exported so callers can name type-tagged payloads without a direct
/// dependency.
pub use bsp_schema::{ElementKind, TypeId};
