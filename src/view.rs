// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device-side views (§6, and the "device views as value types" design
//! note): trivially copyable, non-owning handles into a table's slot
//! array, usable from worker closures without any ownership tie to the
//! owning [`crate::map::StaticMap`] / [`crate::multimap::StaticMultiMap`].
//!
//! A view carries a raw pointer to the owning table's [`Backing`], the
//! probe sequence, the group width, and the hash function, exactly the
//! fields the design notes call for. Nothing here extends the container's
//! lifetime: letting a view outlive its container is undefined behavior,
//! per the documented (not enforced) contract in the error design.

use crate::backing::Backing;
use crate::group;
use crate::probe::ProbeSequence;

/// Read-only view supporting `find`/`contains` from worker closures.
pub struct MapConstView<P: ProbeSequence> {
    backing: *const Backing,
    group_size: usize,
    probe: P,
    hash_fn: fn(u64) -> u64,
}

unsafe impl<P: ProbeSequence> Send for MapConstView<P> {}
unsafe impl<P: ProbeSequence> Sync for MapConstView<P> {}

impl<P: ProbeSequence + Copy> Clone for MapConstView<P> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<P: ProbeSequence + Copy> Copy for MapConstView<P> {}

impl<P: ProbeSequence> MapConstView<P> {
    pub(crate) fn new(backing: *const Backing, group_size: usize, probe: P, hash_fn: fn(u64) -> u64) -> Self {
        Self {
            backing,
            group_size,
            probe,
            hash_fn,
        }
    }

    /// # Safety
    /// The owning table must still be alive.
    pub unsafe fn find_bits(&self, key_bits: u64) -> Option<u64> {
        let backing = &*self.backing;
        let hash = (self.hash_fn)(key_bits);
        group::group_find(backing, &self.probe, self.group_size, hash, |k| k == key_bits)
            .map(|idx| backing.load_pair_bits(idx).1)
    }

    /// # Safety
    /// The owning table must still be alive.
    pub unsafe fn contains_bits(&self, key_bits: u64) -> bool {
        self.find_bits(key_bits).is_some()
    }
}

/// Mutable view supporting `insert` from worker closures, for a
/// unique-key table.
pub struct MapMutView<P: ProbeSequence> {
    backing: *const Backing,
    group_size: usize,
    probe: P,
    hash_fn: fn(u64) -> u64,
}

unsafe impl<P: ProbeSequence> Send for MapMutView<P> {}
unsafe impl<P: ProbeSequence> Sync for MapMutView<P> {}

impl<P: ProbeSequence + Copy> Clone for MapMutView<P> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<P: ProbeSequence + Copy> Copy for MapMutView<P> {}

impl<P: ProbeSequence> MapMutView<P> {
    pub(crate) fn new(backing: *const Backing, group_size: usize, probe: P, hash_fn: fn(u64) -> u64) -> Self {
        Self {
            backing,
            group_size,
            probe,
            hash_fn,
        }
    }

    /// # Safety
    /// The owning table must still be alive.
    pub unsafe fn insert_bits(&self, key_bits: u64, value_bits: u64) -> bool {
        let backing = &*self.backing;
        let hash = (self.hash_fn)(key_bits);
        group::group_insert_unique(backing, &self.probe, self.group_size, hash, key_bits, value_bits, |k| {
            k == key_bits
        })
    }
}

/// Mutable view supporting `insert` from worker closures, for a
/// duplicate-permitting (multimap) table.
pub struct MultiMapMutView<P: ProbeSequence> {
    backing: *const Backing,
    group_size: usize,
    probe: P,
    hash_fn: fn(u64) -> u64,
}

unsafe impl<P: ProbeSequence> Send for MultiMapMutView<P> {}
unsafe impl<P: ProbeSequence> Sync for MultiMapMutView<P> {}

impl<P: ProbeSequence + Copy> Clone for MultiMapMutView<P> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<P: ProbeSequence + Copy> Copy for MultiMapMutView<P> {}

impl<P: ProbeSequence> MultiMapMutView<P> {
    pub(crate) fn new(backing: *const Backing, group_size: usize, probe: P, hash_fn: fn(u64) -> u64) -> Self {
        Self {
            backing,
            group_size,
            probe,
            hash_fn,
        }
    }

    /// # Safety
    /// The owning table must still be alive.
    pub unsafe fn insert_bits(&self, key_bits: u64, value_bits: u64) {
        let backing = &*self.backing;
        let hash = (self.hash_fn)(key_bits);
        group::group_insert_multi(backing, &self.probe, self.group_size, hash, key_bits, value_bits);
    }
}

/// Read-only view supporting `count`/iteration-style matching from worker
/// closures, for the multimap.
pub struct MultiMapConstView<P: ProbeSequence> {
    backing: *const Backing,
    group_size: usize,
    probe: P,
    hash_fn: fn(u64) -> u64,
}

unsafe impl<P: ProbeSequence> Send for MultiMapConstView<P> {}
unsafe impl<P: ProbeSequence> Sync for MultiMapConstView<P> {}

impl<P: ProbeSequence + Copy> Clone for MultiMapConstView<P> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<P: ProbeSequence + Copy> Copy for MultiMapConstView<P> {}

impl<P: ProbeSequence> MultiMapConstView<P> {
    pub(crate) fn new(backing: *const Backing, group_size: usize, probe: P, hash_fn: fn(u64) -> u64) -> Self {
        Self {
            backing,
            group_size,
            probe,
            hash_fn,
        }
    }

    /// # Safety
    /// The owning table must still be alive.
    pub unsafe fn for_each_match_bits(&self, key_bits: u64, visit: impl FnMut(u64, u64)) -> usize {
        let backing = &*self.backing;
        let hash = (self.hash_fn)(key_bits);
        group::group_for_each_match(backing, &self.probe, self.group_size, hash, |k| k == key_bits, visit)
    }
}
