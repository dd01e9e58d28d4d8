// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
//! Many producers, one store: nothing lost, nothing duplicated.

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bsp_msgstore::{I64Codec, MessageStore, StoreError};
use common::{pointer, shuffle, simple, XorShift64};

const WORKERS: usize = 8;
const PER_WORKER: usize = 2_000;
const DESTINATIONS: i64 = 97;

#[test]
fn two_threads_same_destination_both_land() {
    let (enc, builder) = simple();
    let store: MessageStore<i64> = builder.open(0).unwrap();
    std::thread::scope(|s| {
        s.spawn(|| store.add(enc.encode_single(7_i64, "x")).unwrap());
        s.spawn(|| store.add(enc.encode_single(7_i64, "y")).unwrap());
    });
    store.seal();
    let mut got: Vec<Vec<u8>> = store
        .drain_for(&7)
        .unwrap()
        .into_iter()
        .map(|p| p.bytes.to_vec())
        .collect();
    got.sort();
    assert_eq!(got, vec![b"x".to_vec(), b"y".to_vec()]);
}

#[test]
fn many_producers_lose_and_duplicate_nothing() {
    let (enc, builder) = simple();
    let store: MessageStore<i64> = builder.open(0).unwrap();

    std::thread::scope(|s| {
        for worker in 0..WORKERS {
            let store = &store;
            s.spawn(move || {
                let mut rng = XorShift64::new(worker as u64 + 1);
                let mut seqs: Vec<usize> = (0..PER_WORKER).collect();
                shuffle(&mut rng, &mut seqs);
                for seq in seqs {
                    let tag = (worker * PER_WORKER + seq) as i64;
                    let dest = tag % DESTINATIONS;
                    store
                        .add(enc.encode_value::<I64Codec, _, _>(dest, &tag))
                        .unwrap();
                }
            });
        }
    });
    store.seal();

    let mut seen = vec![0u8; WORKERS * PER_WORKER];
    for (dest, payloads) in store.drain_all().unwrap() {
        for payload in payloads {
            let tag = payload.decode_with::<I64Codec, i64>().unwrap();
            assert_eq!(tag % DESTINATIONS, dest, "message routed to wrong vertex");
            seen[tag as usize] += 1;
        }
    }
    assert!(seen.iter().all(|&n| n == 1), "lost or duplicated messages");
    assert_eq!(store.stats().deliveries, (WORKERS * PER_WORKER) as u64);
}

#[test]
fn per_producer_order_survives_interleaving() {
    let (enc, builder) = simple();
    let store: MessageStore<i64> = builder.open(0).unwrap();

    std::thread::scope(|s| {
        for worker in 0..WORKERS {
            let store = &store;
            s.spawn(move || {
                for seq in 0..PER_WORKER as i64 {
                    // Every worker targets the same hot vertex.
                    let body = ((worker as i64) << 32) | seq;
                    store
                        .add(enc.encode_value::<I64Codec, _, _>(0_i64, &body))
                        .unwrap();
                }
            });
        }
    });
    store.seal();

    let mut last: BTreeMap<i64, i64> = BTreeMap::new();
    for payload in store.drain_for(&0).unwrap() {
        let body = payload.decode_with::<I64Codec, i64>().unwrap();
        let (worker, seq) = (body >> 32, body & 0xFFFF_FFFF);
        if let Some(prev) = last.insert(worker, seq) {
            assert!(seq > prev, "worker {worker} reordered: {prev} then {seq}");
        }
    }
    assert_eq!(last.len(), WORKERS);
}

#[test]
fn concurrent_broadcasts_share_and_deliver_once() {
    let (enc, builder) = pointer();
    let store: MessageStore<i64> = builder.open(0).unwrap();
    let fanout: Vec<i64> = (0..DESTINATIONS).collect();

    std::thread::scope(|s| {
        for worker in 0..WORKERS {
            let (store, fanout) = (&store, &fanout);
            s.spawn(move || {
                let mut rng = XorShift64::new(0xB5 + worker as u64);
                for round in 0..50_i64 {
                    let mut ids = fanout.clone();
                    shuffle(&mut rng, &mut ids);
                    let tag = (worker as i64) * 1_000 + round;
                    let record = enc
                        .encode_broadcast_value::<I64Codec, _, _>(ids, &tag)
                        .unwrap();
                    store.add(record).unwrap();
                }
            });
        }
    });
    store.seal();

    let groups = store.take_shared_groups().unwrap();
    assert_eq!(groups.len(), WORKERS * 50);
    for dest in 0..DESTINATIONS {
        let payloads = store.drain_for(&dest).unwrap();
        assert_eq!(payloads.len(), WORKERS * 50, "destination {dest}");
    }
}

#[test]
fn adds_racing_seal_either_land_or_fail_cleanly() {
    let (enc, builder) = simple();
    let store: MessageStore<i64> = builder.open(9).unwrap();
    let accepted = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for worker in 0..WORKERS {
            let (store, accepted) = (&store, &accepted);
            s.spawn(move || {
                for i in 0..PER_WORKER as i64 {
                    match store.add(enc.encode_single(worker as i64, i.to_le_bytes().to_vec())) {
                        Ok(()) => {
                            accepted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            assert_eq!(err, StoreError::Sealed { superstep: 9 });
                            return;
                        }
                    }
                }
            });
        }
        s.spawn(|| store.seal());
    });

    // Everything acknowledged before the seal is readable afterwards.
    let delivered: usize = store.drain_all().unwrap().values().map(Vec::len).sum();
    assert_eq!(delivered, accepted.load(Ordering::Relaxed));
}
