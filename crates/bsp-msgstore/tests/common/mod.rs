// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::cast_possible_truncation)]

use std::sync::Once;

use bsp_msgstore::{
    MessageEncoder, MessageStore, StoreBuilder, StrategyRegistry, POINTER_MESSAGE_STORE,
    SIMPLE_MESSAGE_STORE,
};

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new PRNG; a zero seed is replaced with 1.
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next value in the xorshift64* sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Pseudo-random value in `[0, upper)` (modulo bias is fine for tests).
    pub fn gen_range_usize(&mut self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        (self.next_u64() as usize) % upper
    }
}

/// Fisher–Yates shuffle (deterministic).
pub fn shuffle<T>(rng: &mut XorShift64, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range_usize(i + 1);
        items.swap(i, j);
    }
}

/// Routes `tracing` output through the test harness once per binary.
/// Set `RUST_LOG`-style filtering via `TEST_LOG=debug`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let level = match std::env::var("TEST_LOG").as_deref() {
            Ok("trace") => tracing::Level::TRACE,
            Ok("debug") => tracing::Level::DEBUG,
            _ => tracing::Level::WARN,
        };
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .try_init();
    });
}

/// Encoder and builder for the byte-array strategy.
pub fn simple() -> (MessageEncoder, StoreBuilder) {
    init_tracing();
    StrategyRegistry::with_builtin()
        .create(SIMPLE_MESSAGE_STORE)
        .expect("builtin strategy")
}

/// Encoder and builder for the shared-payload strategy.
pub fn pointer() -> (MessageEncoder, StoreBuilder) {
    init_tracing();
    StrategyRegistry::with_builtin()
        .create(POINTER_MESSAGE_STORE)
        .expect("builtin strategy")
}

/// Drains `destination` and returns the bodies as byte vectors.
pub fn bodies(store: &MessageStore<i64>, destination: i64) -> Vec<Vec<u8>> {
    store
        .drain_for(&destination)
        .expect("store sealed")
        .into_iter()
        .map(|p| p.bytes.to_vec())
        .collect()
}
