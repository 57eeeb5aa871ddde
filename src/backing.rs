// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot array storage (C1), dispatching to the packed or split layout
//! chosen once at construction, plus the abstract allocator seam named in
//! the external construction interface. Allocation itself is modeled as an
//! opaque typed allocator rather than a concrete arena; [`SlotAllocator`]
//! is kept intentionally thin so a caller can plug in an arena or
//! pinned-memory allocator without this crate needing to know anything
//! about it.

use crate::slot::{CasCapability, InsertOutcome, PackedSlot, SplitSlot};

/// Seam for slot-array allocation. The default implementation just asks
/// the global allocator for a `Vec`; callers embedding this crate in a
/// larger system with its own arena can provide their own.
pub trait SlotAllocator: Send + Sync {
    fn allocate_packed(&self, count: usize, empty_key_bits: u32, empty_value_bits: u32) -> Vec<PackedSlot>;
    fn allocate_split(
        &self,
        count: usize,
        empty_key_bits: u64,
        empty_value_bits: u64,
    ) -> Vec<SplitSlot>;
}

/// `Vec`-backed allocator used when the caller does not supply one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocator;

impl SlotAllocator for DefaultAllocator {
    fn allocate_packed(&self, count: usize, empty_key_bits: u32, empty_value_bits: u32) -> Vec<PackedSlot> {
        (0..count)
            .map(|_| PackedSlot::new(empty_key_bits, empty_value_bits))
            .collect()
    }

    fn allocate_split(
        &self,
        count: usize,
        empty_key_bits: u64,
        empty_value_bits: u64,
    ) -> Vec<SplitSlot> {
        (0..count)
            .map(|_| SplitSlot::new(empty_key_bits, empty_value_bits))
            .collect()
    }
}

/// Owns the slot array for one table and knows how to claim, read, and scan
/// it without the caller needing to know which physical layout was chosen.
pub enum Backing {
    Packed {
        slots: Vec<PackedSlot>,
        empty_key_bits: u32,
        empty_value_bits: u32,
    },
    Split {
        slots: Vec<SplitSlot>,
        empty_key_bits: u64,
        empty_value_bits: u64,
        capability: CasCapability,
    },
}

impl Backing {
    pub fn new_packed(
        allocator: &dyn SlotAllocator,
        capacity: usize,
        empty_key_bits: u32,
        empty_value_bits: u32,
    ) -> Self {
        Backing::Packed {
            slots: allocator.allocate_packed(capacity, empty_key_bits, empty_value_bits),
            empty_key_bits,
            empty_value_bits,
        }
    }

    pub fn new_split(
        allocator: &dyn SlotAllocator,
        capacity: usize,
        empty_key_bits: u64,
        empty_value_bits: u64,
        capability: CasCapability,
    ) -> Self {
        Backing::Split {
            slots: allocator.allocate_split(capacity, empty_key_bits, empty_value_bits),
            empty_key_bits,
            empty_value_bits,
            capability,
        }
    }

    pub fn capacity(&self) -> usize {
        match self {
            Backing::Packed { slots, .. } => slots.len(),
            Backing::Split { slots, .. } => slots.len(),
        }
    }

    #[inline]
    pub fn is_empty_key(&self, bits: u64) -> bool {
        match self {
            Backing::Packed { empty_key_bits, .. } => bits == u64::from(*empty_key_bits),
            Backing::Split { empty_key_bits, .. } => bits == *empty_key_bits,
        }
    }

    #[inline]
    pub fn empty_value_bits(&self) -> u64 {
        match self {
            Backing::Packed { empty_value_bits, .. } => u64::from(*empty_value_bits),
            Backing::Split { empty_value_bits, .. } => *empty_value_bits,
        }
    }

    #[inline]
    pub fn load_key_bits(&self, idx: usize) -> u64 {
        match self {
            Backing::Packed { slots, .. } => u64::from(slots[idx].load_key()),
            Backing::Split { slots, .. } => slots[idx].load_key(),
        }
    }

    #[inline]
    pub fn load_pair_bits(&self, idx: usize) -> (u64, u64) {
        match self {
            Backing::Packed { slots, .. } => {
                let (k, v) = slots[idx].load();
                (u64::from(k), u64::from(v))
            }
            Backing::Split { slots, .. } => (slots[idx].load_key(), slots[idx].load_value()),
        }
    }

    /// Single-worker claim attempt on slot `idx` (C3), dispatched to the
    /// layout this backing was constructed with.
    pub fn try_claim(
        &self,
        idx: usize,
        key_bits: u64,
        value_bits: u64,
        key_matches: impl Fn(u64) -> bool,
    ) -> InsertOutcome {
        match self {
            Backing::Packed {
                slots,
                empty_key_bits,
                empty_value_bits,
            } => slots[idx].try_claim(
                key_bits as u32,
                value_bits as u32,
                *empty_key_bits,
                *empty_value_bits,
                |k| key_matches(u64::from(k)),
            ),
            Backing::Split {
                slots,
                empty_key_bits,
                empty_value_bits,
                capability,
            } => slots[idx].try_claim(
                key_bits,
                value_bits,
                *empty_key_bits,
                *empty_value_bits,
                *capability,
                key_matches,
            ),
        }
    }

    /// Full scan counting occupied (non-sentinel-key) slots (C7,
    /// `get_size` for the multimap).
    pub fn scan_occupied(&self) -> usize {
        (0..self.capacity())
            .filter(|&i| !self.is_empty_key(self.load_key_bits(i)))
            .count()
    }
}
