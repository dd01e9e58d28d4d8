// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
//! Property tests: delivery is exact and per-producer ordered for arbitrary
//! message streams and shard counts.

mod common;

use std::collections::BTreeMap;

use bsp_msgstore::{
    I64Codec, MessageEncoder, MessageStore, StoreBuilder, StoreOptions, POINTER, SIMPLE,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Single(i64),
    Broadcast(Vec<i64>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0_i64..32).prop_map(Op::Single),
        1 => prop::collection::vec(0_i64..32, 0..8).prop_map(Op::Broadcast),
    ]
}

fn shards_strategy() -> impl Strategy<Value = usize> {
    (0_u32..=6).prop_map(|exp| 1_usize << exp)
}

proptest! {
    #[test]
    fn flat_store_delivers_exactly_in_order(
        dests in prop::collection::vec(0_i64..64, 0..256),
        shards in shards_strategy(),
    ) {
        let builder = StoreBuilder::new(SIMPLE, StoreOptions::new(shards, 0).unwrap());
        let enc = MessageEncoder::new(SIMPLE);
        let store: MessageStore<i64> = builder.open(0).unwrap();

        let mut expected: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (seq, dest) in dests.iter().copied().enumerate() {
            let seq = seq as i64;
            store.add(enc.encode_value::<I64Codec, _, _>(dest, &seq)).unwrap();
            expected.entry(dest).or_default().push(seq);
        }
        store.seal();

        let mut got: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (dest, payloads) in store.drain_all().unwrap() {
            let values = payloads
                .iter()
                .map(|p| p.decode_with::<I64Codec, i64>().unwrap())
                .collect();
            got.insert(dest, values);
        }
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn grouped_store_matches_a_naive_model(
        ops in prop::collection::vec(op_strategy(), 0..64),
        shards in shards_strategy(),
    ) {
        let builder = StoreBuilder::new(POINTER, StoreOptions::new(shards, 0).unwrap());
        let enc = MessageEncoder::new(POINTER);
        let store: MessageStore<i64> = builder.open(3).unwrap();

        let mut expected: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        let mut broadcasts = 0_usize;
        for (seq, op) in ops.iter().enumerate() {
            let seq = seq as i64;
            match op {
                Op::Single(dest) => {
                    store.add(enc.encode_value::<I64Codec, _, _>(*dest, &seq)).unwrap();
                    expected.entry(*dest).or_default().push(seq);
                }
                Op::Broadcast(dests) => {
                    let record = enc
                        .encode_broadcast_value::<I64Codec, _, _>(dests.iter().copied(), &seq)
                        .unwrap();
                    for dest in record.destinations() {
                        expected.entry(*dest).or_default().push(seq);
                    }
                    store.add(record).unwrap();
                    broadcasts += 1;
                }
            }
        }
        store.seal();

        let deliveries: usize = expected.values().map(Vec::len).sum();
        prop_assert_eq!(store.len(), deliveries);
        prop_assert_eq!(store.take_shared_groups().unwrap().len(), broadcasts);

        for (dest, want) in &expected {
            let got: Vec<i64> = store
                .drain_for(dest)
                .unwrap()
                .iter()
                .map(|p| p.decode_with::<I64Codec, i64>().unwrap())
                .collect();
            prop_assert_eq!(&got, want);
        }
        prop_assert!(store.is_empty());
    }
}
