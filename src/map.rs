// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `StaticMap`: fixed-capacity concurrent hash map with unique keys (C5,
//! C7). Bulk operations launch one parallel worker per input item; each
//! worker drives the cooperative group protocol of [`crate::group`] over
//! its own key, so `group_size` controls the probing window width, not how
//! work is spread across threads (that is rayon's job).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::backing::{Backing, DefaultAllocator, SlotAllocator};
use crate::config::LaunchConfig;
use crate::group;
use crate::hash::splitmix64;
use crate::probe::{round_capacity, DoubleHashing, ProbeSequence};
use crate::scalar::{Key, Value};
use crate::slot::CasCapability;
use crate::stream::Stream;
use crate::view::{MapConstView, MapMutView};

/// Fixed-capacity concurrent hash map with unique keys.
///
/// Constructed once with a capacity, an empty-key sentinel, and an
/// empty-value sentinel; never resized, never deletes. See `SPEC_FULL.md`
/// for the full contract (no-hole invariant, sentinel rules, the three
/// slot-claim protocols).
pub struct StaticMap<K: Key, V: Value, P: ProbeSequence = DoubleHashing> {
    backing: Box<Backing>,
    capacity: usize,
    group_size: usize,
    probe: P,
    empty_key: K,
    empty_value: V,
    hash_fn: fn(u64) -> u64,
    size: AtomicUsize,
    config: LaunchConfig,
}

impl<K: Key, V: Value> StaticMap<K, V, DoubleHashing> {
    /// Construct with capacity clamped to at least 1, a single-lane
    /// probing window, double hashing, and the default scalar hash.
    /// Initialization is launched on `stream` before this returns.
    pub fn new(capacity: usize, empty_key: K, empty_value: V, stream: &Stream) -> Self {
        Self::with_options(
            capacity,
            empty_key,
            empty_value,
            1,
            DoubleHashing,
            splitmix64,
            &DefaultAllocator,
            stream,
        )
    }
}

impl<K: Key, V: Value, P: ProbeSequence> StaticMap<K, V, P> {
    /// Full constructor: group width, probe sequence, hash function, and
    /// allocator are all caller-selectable (§6 construction interface).
    #[allow(clippy::too_many_arguments)]
    pub fn with_options(
        capacity: usize,
        empty_key: K,
        empty_value: V,
        group_size: usize,
        probe: P,
        hash_fn: fn(u64) -> u64,
        allocator: &dyn SlotAllocator,
        stream: &Stream,
    ) -> Self {
        let group_size = group_size.max(1);
        let capacity = round_capacity(capacity, group_size);
        let packable = K::PACKABLE && V::PACKABLE;
        let backing = stream.launch(|| {
            if packable {
                Backing::new_packed(
                    allocator,
                    capacity,
                    empty_key.to_packed_bits(),
                    empty_value.to_packed_bits(),
                )
            } else {
                Backing::new_split(
                    allocator,
                    capacity,
                    empty_key.to_bits(),
                    empty_value.to_bits(),
                    CasCapability::BackToBack,
                )
            }
        });
        log::debug!(
            "StaticMap: capacity={capacity} group_size={group_size} packed={packable}"
        );
        Self {
            backing: Box::new(backing),
            capacity,
            group_size,
            probe,
            empty_key,
            empty_value,
            hash_fn,
            size: AtomicUsize::new(0),
            config: LaunchConfig::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> LaunchConfig {
        self.config
    }

    pub fn set_config(&mut self, config: LaunchConfig) {
        self.config = config;
    }

    fn key_matches(&self, bits: u64, key: K) -> bool {
        bits == key.to_bits()
    }

    /// One cooperative-group insert attempt for a single key/value pair.
    fn insert_one(&self, key: K, value: V) -> bool {
        debug_assert!(key.to_bits() != self.empty_key.to_bits(), "key equals empty_key sentinel");
        let key_bits = key.to_bits();
        let hash = (self.hash_fn)(key_bits);
        group::group_insert_unique(
            &self.backing,
            &self.probe,
            self.group_size,
            hash,
            key_bits,
            value.to_bits(),
            |bits| self.key_matches(bits, key),
        )
    }

    /// Bulk insert (§4.6). Increments `size_` by the number of pairs newly
    /// inserted (duplicates, including collisions within this same call,
    /// do not count).
    pub fn insert(&self, items: &[(K, V)], stream: &Stream) {
        if items.is_empty() {
            return;
        }
        log::trace!("StaticMap::insert: {} items", items.len());
        let successes = stream.launch(|| {
            items
                .par_iter()
                .map(|&(k, v)| usize::from(self.insert_one(k, v)))
                .sum::<usize>()
        });
        self.size.fetch_add(successes, Ordering::Relaxed);
    }

    /// Bulk conditional insert: only items where `pred(stencil[i])` holds
    /// are attempted.
    pub fn insert_if<S: Sync>(
        &self,
        items: &[(K, V)],
        stencil: &[S],
        pred: impl Fn(&S) -> bool + Sync,
        stream: &Stream,
    ) {
        assert_eq!(items.len(), stencil.len(), "stencil length must match items length");
        if items.is_empty() {
            return;
        }
        let successes = stream.launch(|| {
            items
                .par_iter()
                .zip(stencil.par_iter())
                .filter(|(_, s)| pred(s))
                .map(|(&(k, v), _)| usize::from(self.insert_one(k, v)))
                .sum::<usize>()
        });
        self.size.fetch_add(successes, Ordering::Relaxed);
    }

    /// Bulk find (§4.6): one value (or `empty_value`) per probe key.
    pub fn find(&self, keys: &[K], stream: &Stream) -> Vec<V> {
        if keys.is_empty() {
            return Vec::new();
        }
        stream.launch(|| {
            keys.par_iter()
                .map(|&k| {
                    let key_bits = k.to_bits();
                    let hash = (self.hash_fn)(key_bits);
                    group::group_find(&self.backing, &self.probe, self.group_size, hash, |bits| {
                        self.key_matches(bits, k)
                    })
                    .map(|idx| V::from_bits(self.backing.load_pair_bits(idx).1))
                    .unwrap_or(self.empty_value)
                })
                .collect()
        })
    }

    /// Bulk contains (§4.6): one bool per probe key.
    pub fn contains(&self, keys: &[K], stream: &Stream) -> Vec<bool> {
        if keys.is_empty() {
            return Vec::new();
        }
        stream.launch(|| {
            keys.par_iter()
                .map(|&k| {
                    let key_bits = k.to_bits();
                    let hash = (self.hash_fn)(key_bits);
                    group::group_find(&self.backing, &self.probe, self.group_size, hash, |bits| {
                        self.key_matches(bits, k)
                    })
                    .is_some()
                })
                .collect()
        })
    }

    /// Current size (C7): the number of successful inserts observed so
    /// far, maintained incrementally (no scan).
    pub fn get_size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn get_load_factor(&self) -> f64 {
        self.get_size() as f64 / self.capacity as f64
    }

    /// Diagnostic-only: histogram of (probe length, occupied-slot count)
    /// pairs, used by the benches and the concurrent-insert invariant test
    /// to report probe-length distribution on failure. Not part of the
    /// external operation surface.
    pub fn debug_histogram(&self) -> Vec<(usize, usize)> {
        let mut hist: HashMap<usize, usize> = HashMap::new();
        for idx in 0..self.capacity {
            let key_bits = self.backing.load_key_bits(idx);
            if self.backing.is_empty_key(key_bits) {
                continue;
            }
            let hash = (self.hash_fn)(key_bits);
            let target_window = (idx / self.group_size) * self.group_size;
            let mut window = self.probe.initial_window(hash, self.capacity, self.group_size);
            let mut steps = 0usize;
            while window != target_window && steps <= self.capacity {
                window = self.probe.next_window(hash, window, self.capacity, self.group_size);
                steps += 1;
            }
            *hist.entry(steps).or_insert(0) += 1;
        }
        let mut v: Vec<_> = hist.into_iter().collect();
        v.sort_unstable();
        v
    }

    /// A read-only device view for use inside parallel worker closures.
    ///
    /// # Safety
    /// The returned view must not outlive `self`.
    pub unsafe fn const_view(&self) -> MapConstView<P>
    where
        P: Copy,
    {
        MapConstView::new(
            &*self.backing as *const Backing,
            self.group_size,
            self.probe,
            self.hash_fn,
        )
    }

    /// A mutable device view for use inside parallel worker closures.
    ///
    /// # Safety
    /// The returned view must not outlive `self`.
    pub unsafe fn mut_view(&self) -> MapMutView<P>
    where
        P: Copy,
    {
        MapMutView::new(
            &*self.backing as *const Backing,
            self.group_size,
            self.probe,
            self.hash_fn,
        )
    }
}
