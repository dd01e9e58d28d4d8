// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! bsp-schema: compact type identifiers for graph elements.
//!
//! A [`TypeId`] tags a vertex or edge label carried inside BSP messages. It is
//! a `(u32, kind)` pair with a stable two-field wire form that is byte
//! compatible with the protobuf `TypeIdProto` message used by schema services.
//!
//! Decoding never fails on an unknown category: peers running a newer schema
//! can introduce categories without crashing older receivers.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod type_id;
pub mod wire;

/// Type identifier and element categories.
pub use type_id::{ElementKind, TypeId};
/// Protobuf message and its decoding error.
pub use wire::{CodecError, TypeIdProto};
