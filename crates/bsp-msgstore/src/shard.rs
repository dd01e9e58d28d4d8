// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Destination sharding for the message index.
//!
//! ```text
//! shard = fx_hash(destination) & (shards - 1)
//! ```
//!
//! Producers only contend when they hit the same shard, so the number of
//! shards bounds lock contention rather than a single global lock. Shard
//! routing is process-local: it never reaches the wire and may change
//! between releases.

use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;

/// Default shard count.
pub const DEFAULT_SHARDS: usize = 64;

/// Upper bound on the shard count.
pub const MAX_SHARDS: usize = 4096;

// Compile-time assertion: mask arithmetic needs powers of two.
const _: () = assert!(
    DEFAULT_SHARDS.is_power_of_two() && MAX_SHARDS.is_power_of_two(),
    "shard counts must be powers of two"
);

/// Whether `shards` is a usable shard count (power of two, `1..=MAX_SHARDS`).
#[must_use]
pub const fn is_valid_shard_count(shards: usize) -> bool {
    shards.is_power_of_two() && shards <= MAX_SHARDS
}

/// Shard index of `destination` for a store with `shards` shards.
///
/// `shards` must be a power of two (see [`is_valid_shard_count`]).
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn shard_of<I: Hash + ?Sized>(destination: &I, shards: usize) -> usize {
    let mask = (shards as u64).wrapping_sub(1);
    // The mask keeps the value below `shards`, which fits in usize.
    (FxBuildHasher.hash_one(destination) & mask) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_deterministic_within_a_process() {
        let a = shard_of(&42_i64, DEFAULT_SHARDS);
        let b = shard_of(&42_i64, DEFAULT_SHARDS);
        assert_eq!(a, b);
    }

    #[test]
    fn shard_is_always_in_bounds() {
        for shards in [1, 2, 8, DEFAULT_SHARDS, MAX_SHARDS] {
            for i in 0..1000_i64 {
                let shard = shard_of(&i, shards);
                assert!(shard < shards, "shard {shard} >= {shards} for {i}");
            }
        }
    }

    #[test]
    fn single_shard_routes_everything_to_zero() {
        assert_eq!(shard_of("anything", 1), 0);
        assert_eq!(shard_of(&u64::MAX, 1), 0);
    }

    #[test]
    fn integer_ids_spread_over_shards() {
        let mut hit = [false; DEFAULT_SHARDS];
        for i in 0..10_000_i64 {
            hit[shard_of(&i, DEFAULT_SHARDS)] = true;
        }
        let used = hit.iter().filter(|h| **h).count();
        assert!(used > DEFAULT_SHARDS / 2, "only {used} shards used");
    }

    #[test]
    fn shard_count_validation() {
        assert!(is_valid_shard_count(1));
        assert!(is_valid_shard_count(64));
        assert!(!is_valid_shard_count(0));
        assert!(!is_valid_shard_count(48));
        assert!(!is_valid_shard_count(MAX_SHARDS * 2));
    }
}
