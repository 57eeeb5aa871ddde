// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `StaticMultiMap`: fixed-capacity concurrent hash map permitting
//! duplicate keys (C5, C6, C7). Built on the same slot/probe/group
//! machinery as [`crate::map::StaticMap`]; the differences are all in the
//! bulk operation surface: no duplicate rejection on insert, and a family
//! of counting/retrieval operations with "outer" (left-join) variants that
//! still emit one row per probe key even when it has zero matches.

use rayon::prelude::*;

use crate::backing::{Backing, DefaultAllocator, SlotAllocator};
use crate::buffer::{GroupBuffer, MatchCounter, ScatterSlice};
use crate::config::LaunchConfig;
use crate::group;
use crate::hash::splitmix64;
use crate::probe::{round_capacity, DoubleHashing, ProbeSequence};
use crate::scalar::{Key, Value};
use crate::slot::CasCapability;
use crate::stream::{CountFuture, Stream};
use crate::view::{MultiMapConstView, MultiMapMutView};

/// Fixed-capacity concurrent hash map permitting duplicate keys.
///
/// Unlike [`crate::map::StaticMap`], `insert` never rejects a pair: two
/// calls with the same key both occupy their own slot. `get_size` (C7)
/// reports the number of occupied slots by scanning the table, since
/// duplicate-permitting inserts cannot distinguish "new pair" from
/// "another instance of an existing key" without that scan.
pub struct StaticMultiMap<K: Key, V: Value, P: ProbeSequence = DoubleHashing> {
    backing: Box<Backing>,
    capacity: usize,
    group_size: usize,
    probe: P,
    empty_key: K,
    empty_value: V,
    hash_fn: fn(u64) -> u64,
    config: LaunchConfig,
}

impl<K: Key, V: Value> StaticMultiMap<K, V, DoubleHashing> {
    /// Construct with capacity rounded up to the group width, a
    /// single-lane probing window, double hashing, and the default scalar
    /// hash.
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

impl<K: Key, V: Value, P: ProbeSequence> StaticMultiMap<K, V, P> {
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
            "StaticMultiMap: capacity={capacity} group_size={group_size} packed={packable}"
        );
        Self {
            backing: Box::new(backing),
            capacity,
            group_size,
            probe,
            empty_key,
            empty_value,
            hash_fn,
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

    fn key_matches_bits(&self, bits: u64, key_bits: u64) -> bool {
        bits == key_bits
    }

    /// Bulk insert (§4.4): every pair occupies its own slot, duplicates
    /// included. Loops forever per-pair if the table has no remaining
    /// empty slot (§4.7, caller's responsibility to size the table).
    pub fn insert(&self, items: &[(K, V)], stream: &Stream) {
        if items.is_empty() {
            return;
        }
        log::trace!("StaticMultiMap::insert: {} items", items.len());
        stream.launch(|| {
            items.par_iter().for_each(|&(k, v)| {
                let key_bits = k.to_bits();
                let hash = (self.hash_fn)(key_bits);
                group::group_insert_multi(
                    &self.backing,
                    &self.probe,
                    self.group_size,
                    hash,
                    key_bits,
                    v.to_bits(),
                );
            });
        });
    }

    fn count_one(&self, key: K) -> usize {
        let key_bits = key.to_bits();
        let hash = (self.hash_fn)(key_bits);
        group::group_for_each_match(
            &self.backing,
            &self.probe,
            self.group_size,
            hash,
            |bits| self.key_matches_bits(bits, key_bits),
            |_, _| {},
        )
    }

    /// Bulk count (§4.4): number of matches per probe key, zero included.
    /// Returns a future rather than blocking inline.
    pub fn count(&self, keys: &[K], stream: &Stream) -> CountFuture {
        let keys = keys.to_vec();
        let total = stream.launch(|| keys.par_iter().map(|&k| self.count_one(k)).sum::<usize>());
        CountFuture::spawn(move || total)
    }

    /// Outer variant of [`Self::count`] (§4.4, §8 "outer match count law"):
    /// every probe key with zero matches still contributes one to the
    /// total, left-join style — `count_outer(Q) = count(Q) + |{q in Q :
    /// count({q}) == 0}|`.
    pub fn count_outer(&self, keys: &[K], stream: &Stream) -> CountFuture {
        let keys = keys.to_vec();
        let total = stream.launch(|| {
            keys.par_iter()
                .map(|&k| self.count_one(k).max(1))
                .sum::<usize>()
        });
        CountFuture::spawn(move || total)
    }

    /// Bulk pair_count (§4.4): sizing hint for [`Self::pair_retrieve`].
    /// Numerically identical to [`Self::count`], since both probe the same
    /// keys and `pair_retrieve` emits exactly the matches `retrieve` does,
    /// just tagged with the probe key alongside each value.
    pub fn pair_count(&self, keys: &[K], stream: &Stream) -> CountFuture {
        self.count(keys, stream)
    }

    /// Outer variant of [`Self::pair_count`], sized for
    /// [`Self::pair_retrieve_outer`]: see [`Self::count_outer`].
    pub fn pair_count_outer(&self, keys: &[K], stream: &Stream) -> CountFuture {
        self.count_outer(keys, stream)
    }

    /// Bulk retrieve (§4.5, §6): for each probe key, every matching value
    /// is written into `out` at a position reserved via the shared
    /// [`MatchCounter`]; `out` must be at least as long as a prior
    /// `pair_count` result for the same keys. Returns the number of
    /// values actually written.
    pub fn retrieve(&self, keys: &[K], out: &mut [V], stream: &Stream) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let counter = MatchCounter::new();
        let output = ScatterSlice::new(out);
        let buffer_capacity = self.config.retrieval_buffer_size;
        stream.launch(|| {
            keys.par_iter().for_each(|&key| {
                let key_bits = key.to_bits();
                let hash = (self.hash_fn)(key_bits);
                let mut buf: GroupBuffer<V> = GroupBuffer::new(buffer_capacity);
                group::group_for_each_match(
                    &self.backing,
                    &self.probe,
                    self.group_size,
                    hash,
                    |bits| self.key_matches_bits(bits, key_bits),
                    |_, v_bits| buf.push(V::from_bits(v_bits), &counter, &output),
                );
                buf.flush(&counter, &output);
            });
        });
        counter.load()
    }

    /// Outer (left-join) variant of [`Self::retrieve`]: a probe key with
    /// zero matches still contributes one row, `self.empty_value`.
    pub fn retrieve_outer(&self, keys: &[K], out: &mut [V], stream: &Stream) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let counter = MatchCounter::new();
        let output = ScatterSlice::new(out);
        let buffer_capacity = self.config.retrieval_buffer_size;
        let empty_value = self.empty_value;
        stream.launch(|| {
            keys.par_iter().for_each(|&key| {
                let key_bits = key.to_bits();
                let hash = (self.hash_fn)(key_bits);
                let mut buf: GroupBuffer<V> = GroupBuffer::new(buffer_capacity);
                let matches = group::group_for_each_match(
                    &self.backing,
                    &self.probe,
                    self.group_size,
                    hash,
                    |bits| self.key_matches_bits(bits, key_bits),
                    |_, v_bits| buf.push(V::from_bits(v_bits), &counter, &output),
                );
                if matches == 0 {
                    buf.push(empty_value, &counter, &output);
                }
                buf.flush(&counter, &output);
            });
        });
        counter.load()
    }

    /// Bulk pair_retrieve (§4.5): like [`Self::retrieve`], but each
    /// matching slot contributes a `(key, value)` pair so the caller can
    /// recover which probe key a given output row belongs to without a
    /// second pass.
    pub fn pair_retrieve(&self, keys: &[K], out: &mut [(K, V)], stream: &Stream) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let counter = MatchCounter::new();
        let output = ScatterSlice::new(out);
        let buffer_capacity = self.config.retrieval_buffer_size;
        stream.launch(|| {
            keys.par_iter().for_each(|&key| {
                let key_bits = key.to_bits();
                let hash = (self.hash_fn)(key_bits);
                let mut buf: GroupBuffer<(K, V)> = GroupBuffer::new(buffer_capacity);
                group::group_for_each_match(
                    &self.backing,
                    &self.probe,
                    self.group_size,
                    hash,
                    |bits| self.key_matches_bits(bits, key_bits),
                    |_, v_bits| buf.push((key, V::from_bits(v_bits)), &counter, &output),
                );
                buf.flush(&counter, &output);
            });
        });
        counter.load()
    }

    /// Outer variant of [`Self::pair_retrieve`]: a probe key with zero
    /// matches contributes `(key, self.empty_value)`.
    pub fn pair_retrieve_outer(&self, keys: &[K], out: &mut [(K, V)], stream: &Stream) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let counter = MatchCounter::new();
        let output = ScatterSlice::new(out);
        let buffer_capacity = self.config.retrieval_buffer_size;
        let empty_value = self.empty_value;
        stream.launch(|| {
            keys.par_iter().for_each(|&key| {
                let key_bits = key.to_bits();
                let hash = (self.hash_fn)(key_bits);
                let mut buf: GroupBuffer<(K, V)> = GroupBuffer::new(buffer_capacity);
                let matches = group::group_for_each_match(
                    &self.backing,
                    &self.probe,
                    self.group_size,
                    hash,
                    |bits| self.key_matches_bits(bits, key_bits),
                    |_, v_bits| buf.push((key, V::from_bits(v_bits)), &counter, &output),
                );
                if matches == 0 {
                    buf.push((key, empty_value), &counter, &output);
                }
                buf.flush(&counter, &output);
            });
        });
        counter.load()
    }

    /// Current size (C7): occupied-slot scan. Unlike the unique-key map,
    /// there is no cheap incremental counter here: an insert always
    /// succeeds, so "new pair" and "another instance of an existing key"
    /// are indistinguishable at the call site without this scan.
    pub fn get_size(&self) -> usize {
        self.backing.scan_occupied()
    }

    pub fn get_load_factor(&self) -> f64 {
        self.get_size() as f64 / self.capacity as f64
    }

    /// # Safety
    /// The returned view must not outlive `self`.
    pub unsafe fn const_view(&self) -> MultiMapConstView<P>
    where
        P: Copy,
    {
        MultiMapConstView::new(
            &*self.backing as *const Backing,
            self.group_size,
            self.probe,
            self.hash_fn,
        )
    }

    /// # Safety
    /// The returned view must not outlive `self`.
    pub unsafe fn mut_view(&self) -> MultiMapMutView<P>
    where
        P: Copy,
    {
        MultiMapMutView::new(
            &*self.backing as *const Backing,
            self.group_size,
            self.probe,
            self.hash_fn,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_multimap_duplicates_with_capacity_rounding() {
        let stream = Stream::new();
        let map: StaticMultiMap<i32, i32> = StaticMultiMap::with_options(
            200,
            -1,
            -1,
            4,
            DoubleHashing,
            splitmix64,
            &DefaultAllocator,
            &stream,
        );
        assert_eq!(map.capacity() % 4, 0);
        assert!(map.capacity() >= 200);

        let items: Vec<(i32, i32)> = (0..10).map(|i| (7, i)).collect();
        map.insert(&items, &stream);
        assert_eq!(map.get_size(), 10);

        let count = map.count(&[7], &stream).wait();
        assert_eq!(count, 10);

        let mut out = vec![-1; 10];
        let written = map.retrieve(&[7], &mut out, &stream);
        assert_eq!(written, 10);
        out.sort_unstable();
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn scenario_outer_variants_emit_empty_row_on_zero_matches() {
        let stream = Stream::new();
        let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(64, -1, -1, &stream);
        map.insert(&[(1, 10), (1, 11)], &stream);

        let counts = [
            map.count_outer(&[1], &stream).wait(),
            map.count_outer(&[2], &stream).wait(),
        ];
        // Key 2 has zero matches, so the outer variant still counts one
        // (left-join) row for it rather than zero.
        assert_eq!(counts, [2, 1]);

        let mut out = vec![-1; 1];
        let written = map.retrieve_outer(&[2], &mut out, &stream);
        assert_eq!(written, 1);
        assert_eq!(out[0], -1);

        let mut pair_out = vec![(0, -1); 1];
        let pair_written = map.pair_retrieve_outer(&[2], &mut pair_out, &stream);
        assert_eq!(pair_written, 1);
        assert_eq!(pair_out[0], (2, -1));
    }

    #[test]
    fn pair_retrieve_tags_each_value_with_its_probe_key() {
        let stream = Stream::new();
        let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(64, -1, -1, &stream);
        map.insert(&[(1, 10), (2, 20), (1, 11)], &stream);

        let total = map.pair_count(&[1, 2], &stream).wait();
        assert_eq!(total, 3);

        let mut out = vec![(0, 0); 3];
        let written = map.pair_retrieve(&[1, 2], &mut out, &stream);
        assert_eq!(written, 3);
        out.sort_unstable();
        assert_eq!(out, vec![(1, 10), (1, 11), (2, 20)]);
    }

    #[test]
    fn empty_probe_batch_is_noop() {
        let stream = Stream::new();
        let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(16, -1, -1, &stream);
        map.insert(&[], &stream);
        assert_eq!(map.get_size(), 0);
        let mut out: Vec<i32> = Vec::new();
        assert_eq!(map.retrieve(&[], &mut out, &stream), 0);
    }
}
