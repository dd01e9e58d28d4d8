// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-superstep message store.
//!
//! # Lifecycle
//!
//! ```text
//! StoreBuilder::open(n) ──► add()* ──► seal() ──► drain_for()/drain_all() ──► reset() ─┐
//!                            (open)     (sealed)                                         │
//!                              ▲                                                         │
//!                              └──────────────────── superstep n + 1 ◄──────────────────┘
//! ```
//!
//! # Concurrency
//!
//! `add` takes `&self` and locks exactly the shards its record touches, each
//! for the duration of one append. The sealed flag is checked while the
//! shard locks are held and `seal` passes through every shard lock after
//! raising the flag, so an `add` either lands before `seal` returns or fails
//! with [`StoreError::Sealed`]. Broadcast records lock their shards in
//! ascending index order, which keeps concurrent broadcasts deadlock free and
//! makes each record atomic with respect to `seal`.
//!
//! Supersteps are claimed from a sequence shared by the builder and every
//! store it opened: each claim must be exactly one greater than the last
//! sealed superstep, so two supersteps never accept messages at once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::{FxBuildHasher, FxHashMap};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::payload::MessagePayload;
use crate::record::{BroadcastRecord, MessageRecord, Record};
use crate::shard::{is_valid_shard_count, shard_of, DEFAULT_SHARDS, MAX_SHARDS};
use crate::strategy::{StoreLayout, StrategyDescriptor};
use crate::vertex_id::DestinationKey;

/// Errors returned by stores and store builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A superstep was opened out of sequence (skipped, replayed, or while
    /// the previous one is still open).
    #[error(
        "superstep {requested} opened out of sequence (expected {expected}, unsealed {unsealed:?})"
    )]
    InvalidSuperstep {
        /// The only superstep that may be opened next.
        expected: u64,
        /// The superstep that was requested.
        requested: u64,
        /// Superstep still open, which must be sealed first.
        unsealed: Option<u64>,
    },
    /// `add` was called after `seal`.
    #[error("message store for superstep {superstep} is sealed")]
    Sealed {
        /// Superstep of the sealed store.
        superstep: u64,
    },
    /// Draining or resetting requires a sealed store.
    #[error("message store for superstep {superstep} is not sealed")]
    NotSealed {
        /// Superstep of the open store.
        superstep: u64,
    },
    /// A broadcast record was added to a store whose strategy does not share
    /// payloads.
    #[error("strategy {strategy} cannot store shared-payload records")]
    UnsupportedRecord {
        /// Strategy of the store.
        strategy: &'static str,
    },
}

/// Sizing knobs for stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    shards: usize,
    initial_capacity: usize,
}

impl StoreOptions {
    /// Validated options. Returns `None` unless `shards` is a power of two in
    /// `1..=MAX_SHARDS`.
    #[must_use]
    pub const fn new(shards: usize, initial_capacity: usize) -> Option<Self> {
        if is_valid_shard_count(shards) {
            Some(Self {
                shards,
                initial_capacity,
            })
        } else {
            None
        }
    }

    /// Number of index shards.
    #[must_use]
    pub const fn shards(&self) -> usize {
        self.shards
    }

    /// Per-shard destination capacity reserved up front.
    #[must_use]
    pub const fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            initial_capacity: 0,
        }
    }
}

const _: () = assert!(DEFAULT_SHARDS <= MAX_SHARDS);

#[derive(Debug, Default)]
struct SequenceState {
    claimed: Option<u64>,
    sealed: Option<u64>,
}

/// Claimed and sealed supersteps, shared by a builder and the stores it
/// opened.
///
/// At most one superstep is open at a time: superstep `n + 1` can only be
/// claimed once `n` has been claimed and sealed.
#[derive(Debug, Default)]
struct SuperstepSequence {
    state: Mutex<SequenceState>,
}

impl SuperstepSequence {
    fn claim(&self, requested: u64) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if let Some(claimed) = state.claimed {
            let expected = claimed.saturating_add(1);
            let unsealed = (state.sealed != Some(claimed)).then_some(claimed);
            if claimed == u64::MAX || requested != expected || unsealed.is_some() {
                warn!(
                    requested,
                    expected,
                    ?unsealed,
                    "superstep opened out of sequence"
                );
                return Err(StoreError::InvalidSuperstep {
                    expected,
                    requested,
                    unsealed,
                });
            }
        }
        state.claimed = Some(requested);
        Ok(())
    }

    fn seal(&self, superstep: u64) {
        let mut state = lock(&self.state);
        if state.claimed == Some(superstep) {
            state.sealed = Some(superstep);
        }
    }
}

/// Opens stores for one strategy, one superstep at a time.
///
/// Clones share the superstep sequence, so a cloned builder cannot open a
/// superstep its original already opened.
#[derive(Debug, Clone)]
pub struct StoreBuilder {
    strategy: StrategyDescriptor,
    options: StoreOptions,
    sequence: Arc<SuperstepSequence>,
}

impl StoreBuilder {
    /// Builder for `strategy`.
    #[must_use]
    pub fn new(strategy: StrategyDescriptor, options: StoreOptions) -> Self {
        Self {
            strategy,
            options,
            sequence: Arc::default(),
        }
    }

    /// Strategy of every store this builder opens.
    #[must_use]
    pub const fn strategy(&self) -> StrategyDescriptor {
        self.strategy
    }

    /// Sizing applied to every store this builder opens.
    #[must_use]
    pub const fn options(&self) -> StoreOptions {
        self.options
    }

    /// Opens an empty store bound to `superstep`.
    ///
    /// The first open accepts any superstep; every later open (or
    /// [`MessageStore::reset`] of a store from this builder) must claim
    /// exactly the previously sealed superstep plus one.
    ///
    /// # Errors
    /// [`StoreError::InvalidSuperstep`] when `superstep` is out of sequence
    /// or the previously claimed superstep is not sealed yet.
    pub fn open<I: DestinationKey>(&self, superstep: u64) -> Result<MessageStore<I>, StoreError> {
        self.sequence.claim(superstep)?;
        debug!(
            superstep,
            strategy = self.strategy.name(),
            shards = self.options.shards,
            "message store opened"
        );
        Ok(MessageStore::new(
            superstep,
            self.strategy,
            self.options,
            Arc::clone(&self.sequence),
        ))
    }
}

/// One payload together with every destination it was addressed to.
///
/// Produced by grouped (shared payload) stores for the transport layer,
/// which ships the bytes once per group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedGroup<I> {
    /// Destination set, duplicate free.
    pub destinations: Arc<[I]>,
    /// Shared body.
    pub payload: MessagePayload,
}

/// Counters describing what a store accepted in its current superstep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Superstep the store is bound to.
    pub superstep: u64,
    /// Records accepted (a broadcast counts once).
    pub messages: u64,
    /// Broadcast records accepted.
    pub broadcasts: u64,
    /// Per-destination deliveries accepted (a broadcast counts once per
    /// destination).
    pub deliveries: u64,
    /// Serialized payload bytes held (shared payloads counted once).
    pub payload_bytes: u64,
}

#[derive(Debug)]
struct Shard<I> {
    queues: FxHashMap<I, Vec<MessagePayload>>,
}

impl<I: DestinationKey> Shard<I> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    fn push(&mut self, destination: I, payload: MessagePayload) {
        self.queues.entry(destination).or_default().push(payload);
    }

    fn pending(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Default)]
struct Counters {
    messages: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    payload_bytes: AtomicU64,
}

impl Counters {
    fn record(&self, deliveries: usize, payload: &MessagePayload, broadcast: bool) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        if broadcast {
            self.broadcasts.fetch_add(1, Ordering::Relaxed);
        }
        self.deliveries
            .fetch_add(deliveries as u64, Ordering::Relaxed);
        self.payload_bytes
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
    }

    fn clear(&mut self) {
        *self.messages.get_mut() = 0;
        *self.broadcasts.get_mut() = 0;
        *self.deliveries.get_mut() = 0;
        *self.payload_bytes.get_mut() = 0;
    }
}

/// Message store for one superstep.
///
/// Append-only while open, drain-only once sealed. See the module docs for
/// the lifecycle and locking discipline.
#[derive(Debug)]
pub struct MessageStore<I> {
    superstep: u64,
    strategy: StrategyDescriptor,
    sealed: AtomicBool,
    shards: Box<[Mutex<Shard<I>>]>,
    groups: Mutex<Vec<SharedGroup<I>>>,
    counters: Counters,
    sequence: Arc<SuperstepSequence>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Every critical section leaves the shard valid, so a panic elsewhere
    // does not invalidate the data.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn get_mut<T>(mutex: &mut Mutex<T>) -> &mut T {
    mutex.get_mut().unwrap_or_else(PoisonError::into_inner)
}

impl<I: DestinationKey> MessageStore<I> {
    fn new(
        superstep: u64,
        strategy: StrategyDescriptor,
        options: StoreOptions,
        sequence: Arc<SuperstepSequence>,
    ) -> Self {
        let shards = (0..options.shards)
            .map(|_| Mutex::new(Shard::with_capacity(options.initial_capacity)))
            .collect();
        Self {
            superstep,
            strategy,
            sealed: AtomicBool::new(false),
            shards,
            groups: Mutex::default(),
            counters: Counters::default(),
            sequence,
        }
    }

    /// Superstep the store currently belongs to.
    #[must_use]
    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    /// Strategy the store was opened with.
    #[must_use]
    pub fn strategy(&self) -> StrategyDescriptor {
        self.strategy
    }

    /// Whether [`MessageStore::seal`] has been called.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Appends a record.
    ///
    /// Safe to call concurrently from any number of threads. Never blocks on
    /// I/O; waits at most for the appends already holding the same shards.
    ///
    /// # Errors
    /// - [`StoreError::Sealed`] after [`MessageStore::seal`].
    /// - [`StoreError::UnsupportedRecord`] for a broadcast on a flat store.
    pub fn add(&self, record: impl Into<Record<I>>) -> Result<(), StoreError> {
        match record.into() {
            Record::Single(record) => self.add_single(record),
            Record::Broadcast(record) => self.add_broadcast(record),
        }
    }

    fn add_single(&self, record: MessageRecord<I>) -> Result<(), StoreError> {
        let index = shard_of(&record.destination, self.shards.len());
        let mut shard = lock(&self.shards[index]);
        self.ensure_open()?;
        self.counters.record(1, &record.payload, false);
        shard.push(record.destination, record.payload);
        Ok(())
    }

    fn add_broadcast(&self, record: BroadcastRecord<I>) -> Result<(), StoreError> {
        if self.strategy.layout() != StoreLayout::Grouped {
            warn!(
                superstep = self.superstep,
                strategy = self.strategy.name(),
                "shared-payload record rejected by flat store"
            );
            return Err(StoreError::UnsupportedRecord {
                strategy: self.strategy.name(),
            });
        }
        let (destinations, payload) = record.into_parts();
        let shard_count = self.shards.len();

        let mut routed: Vec<(usize, usize)> = destinations
            .iter()
            .enumerate()
            .map(|(pos, id)| (shard_of(id, shard_count), pos))
            .collect();
        // Sorting by (shard, position) fixes the lock order and keeps the
        // per-destination append order stable.
        routed.sort_unstable();

        let mut guards: Vec<(usize, MutexGuard<'_, Shard<I>>)> = Vec::new();
        for &(index, _) in &routed {
            if guards.last().is_none_or(|(held, _)| *held != index) {
                guards.push((index, lock(&self.shards[index])));
            }
        }
        let mut groups = lock(&self.groups);
        self.ensure_open()?;

        let mut slot = 0;
        for &(index, pos) in &routed {
            while guards[slot].0 != index {
                slot += 1;
            }
            guards[slot]
                .1
                .push(destinations[pos].clone(), payload.clone());
        }
        self.counters.record(destinations.len(), &payload, true);
        trace!(
            superstep = self.superstep,
            fanout = destinations.len(),
            "broadcast stored"
        );
        groups.push(SharedGroup {
            destinations,
            payload,
        });
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.sealed.load(Ordering::Acquire) {
            warn!(superstep = self.superstep, "add after seal rejected");
            return Err(StoreError::Sealed {
                superstep: self.superstep,
            });
        }
        Ok(())
    }

    fn ensure_sealed(&self) -> Result<(), StoreError> {
        if self.is_sealed() {
            Ok(())
        } else {
            Err(StoreError::NotSealed {
                superstep: self.superstep,
            })
        }
    }

    /// Makes the store read-only. Idempotent.
    ///
    /// Every `add` that returned before `seal` is visible to later readers.
    pub fn seal(&self) {
        let first = !self.sealed.swap(true, Ordering::AcqRel);
        // Wait out appends that checked the flag before it flipped.
        for shard in &*self.shards {
            drop(lock(shard));
        }
        drop(lock(&self.groups));
        self.sequence.seal(self.superstep);
        if !first {
            return;
        }
        debug!(
            superstep = self.superstep,
            messages = self.counters.messages.load(Ordering::Relaxed),
            deliveries = self.counters.deliveries.load(Ordering::Relaxed),
            "message store sealed"
        );
    }

    /// Removes and returns the messages queued for `destination`, in
    /// insertion order. A second call for the same destination returns an
    /// empty vector.
    ///
    /// Shared payloads come back as handles to the bytes stored once by the
    /// broadcast.
    ///
    /// # Errors
    /// [`StoreError::NotSealed`] while the store is still open.
    pub fn drain_for(&self, destination: &I) -> Result<Vec<MessagePayload>, StoreError> {
        self.ensure_sealed()?;
        let index = shard_of(destination, self.shards.len());
        Ok(lock(&self.shards[index])
            .queues
            .remove(destination)
            .unwrap_or_default())
    }

    /// Removes and returns every queued message, keyed by destination.
    /// Per-destination order is insertion order; map order is unspecified.
    ///
    /// # Errors
    /// [`StoreError::NotSealed`] while the store is still open.
    pub fn drain_all(&self) -> Result<FxHashMap<I, Vec<MessagePayload>>, StoreError> {
        self.ensure_sealed()?;
        let mut out = FxHashMap::default();
        for shard in &*self.shards {
            out.extend(lock(shard).queues.drain());
        }
        Ok(out)
    }

    /// Removes and returns the shared payload groups accepted this superstep,
    /// each payload once with its destination set. A second call returns an
    /// empty vector; flat stores never have groups.
    ///
    /// Groups are the transport's view and the per-destination queues are the
    /// local-delivery view of the same broadcasts. Each view is single pass,
    /// so a consumer takes one of them per destination, never both.
    ///
    /// # Errors
    /// [`StoreError::NotSealed`] while the store is still open.
    pub fn take_shared_groups(&self) -> Result<Vec<SharedGroup<I>>, StoreError> {
        self.ensure_sealed()?;
        Ok(std::mem::take(&mut *lock(&self.groups)))
    }

    /// Deliveries still queued (not yet drained).
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| lock(shard).pending()).sum()
    }

    /// Whether no delivery is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards
            .iter()
            .all(|shard| lock(shard).queues.values().all(Vec::is_empty))
    }

    /// Counters for the current superstep.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            superstep: self.superstep,
            messages: self.counters.messages.load(Ordering::Relaxed),
            broadcasts: self.counters.broadcasts.load(Ordering::Relaxed),
            deliveries: self.counters.deliveries.load(Ordering::Relaxed),
            payload_bytes: self.counters.payload_bytes.load(Ordering::Relaxed),
        }
    }

    /// Clears the store and rebinds it to the next superstep, keeping the
    /// allocated index capacity.
    ///
    /// Returns the number of deliveries that were still queued and are now
    /// discarded (`0` when everything was drained).
    ///
    /// Taking `&mut self` guarantees no drained reference into the store
    /// outlives the superstep.
    ///
    /// # Errors
    /// - [`StoreError::NotSealed`] if the store is still open (resetting it
    ///   would discard messages that are still being produced).
    /// - [`StoreError::InvalidSuperstep`] if the next superstep was already
    ///   opened through the builder.
    pub fn reset(&mut self) -> Result<usize, StoreError> {
        self.ensure_sealed()?;
        let next = self.superstep.saturating_add(1);
        self.sequence.claim(next)?;

        let mut undrained = 0usize;
        for shard in self.shards.iter_mut() {
            let shard = get_mut(shard);
            undrained += shard.pending();
            shard.queues.clear();
        }
        if undrained > 0 {
            warn!(
                superstep = self.superstep,
                undrained, "reset discarded undrained messages"
            );
        }
        get_mut(&mut self.groups).clear();
        self.counters.clear();
        *self.sealed.get_mut() = false;
        self.superstep = next;
        debug!(superstep = next, "message store reset");
        Ok(undrained)
    }
}
