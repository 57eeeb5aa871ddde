// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot storage (C1) and the single-worker slot claim protocols (C3).
//!
//! Two physical slot layouts exist, chosen once per table at construction:
//!
//! - [`PackedSlot`] packs a key and value into a single `AtomicU64` and
//!   claims it with one compare-and-swap. This is only sound when both the
//!   key and value fit in 32 bits each (stable Rust has no 128-bit atomic,
//!   so a combined 64+64 packed word is not available the way it is on a
//!   CUDA device with a 128-bit atomic CAS).
//! - [`SplitSlot`] stores the key and value in independent `AtomicU64`
//!   cells and claims them with two coordinated compare-and-swaps, either
//!   back-to-back ([`CasCapability::BackToBack`]) or key-then-relaxed-store
//!   ([`CasCapability::CasThenStore`]).
//!
//! All slot atomics use [`Ordering::Relaxed`]. Keys are write-once: a caller
//! that observes a slot transition from empty to occupied never needs to see
//! anything else become visible at that instant, because the only further
//! reads of that slot are either the value (guarded by the hazard documented
//! on [`CasCapability::CasThenStore`]) or another probe's equality check
//! against the now-stable key. No cross-group publish/acquire pairing is
//! needed; [`crate::group`] provides intra-group ordering via its own
//! barrier points.

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of one single-worker attempt to claim a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The calling worker's key/value pair now occupies the slot.
    Success,
    /// Another worker already placed an equal key in the slot.
    Duplicate,
    /// The slot was taken by an unrelated key; the caller should advance to
    /// the next probe position.
    Continue,
}

/// Which two-cell CAS strategy a [`SplitSlot`] table uses.
///
/// Real hardware picks this based on whether the target supports an
/// efficient back-to-back dual compare-and-swap; every general-purpose CPU
/// Rust targets does, so [`CasCapability::CasThenStore`] exists mainly to
/// exercise and document the weaker protocol and its read-side hazard, not
/// because any supported target actually lacks back-to-back CAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasCapability {
    /// Two independent compare-and-swaps, one per cell, with the state
    /// table from the component design applied to their outcomes.
    BackToBack,
    /// Compare-and-swap the key only; the value is published with a
    /// relaxed store after the key wins.
    ///
    /// # Hazard
    ///
    /// A concurrent reader can observe a slot whose key has committed but
    /// whose value cell still holds the empty sentinel, if it reads between
    /// the key CAS and the value store. This crate does not retry on a
    /// sentinel value read; callers selecting this capability must ensure
    /// readers do not race their own in-flight inserts, or must add their
    /// own retry-until-non-sentinel loop around [`crate::map::StaticMap`]
    /// lookups.
    CasThenStore,
}

/// A single atomic cell holding both key and value, for pairs whose
/// combined packed width is 64 bits (32-bit key, 32-bit value).
#[repr(transparent)]
pub struct PackedSlot(AtomicU64);

impl PackedSlot {
    #[inline]
    pub fn pack(key_bits: u32, value_bits: u32) -> u64 {
        (u64::from(value_bits) << 32) | u64::from(key_bits)
    }

    #[inline]
    pub fn unpack(word: u64) -> (u32, u32) {
        (word as u32, (word >> 32) as u32)
    }

    pub fn new(empty_key_bits: u32, empty_value_bits: u32) -> Self {
        Self(AtomicU64::new(Self::pack(empty_key_bits, empty_value_bits)))
    }

    #[inline]
    pub fn load_key(&self) -> u32 {
        Self::unpack(self.0.load(Ordering::Relaxed)).0
    }

    #[inline]
    pub fn load(&self) -> (u32, u32) {
        Self::unpack(self.0.load(Ordering::Relaxed))
    }

    /// Single-CAS claim attempt (§4.3a, packed CAS).
    pub fn try_claim(
        &self,
        key_bits: u32,
        value_bits: u32,
        empty_key_bits: u32,
        empty_value_bits: u32,
        key_matches: impl Fn(u32) -> bool,
    ) -> InsertOutcome {
        let expected = Self::pack(empty_key_bits, empty_value_bits);
        let desired = Self::pack(key_bits, value_bits);
        match self
            .0
            .compare_exchange(expected, desired, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => InsertOutcome::Success,
            Err(observed) => {
                let (observed_key, _) = Self::unpack(observed);
                if observed_key != empty_key_bits && key_matches(observed_key) {
                    InsertOutcome::Duplicate
                } else {
                    InsertOutcome::Continue
                }
            }
        }
    }
}

/// Two independent atomic cells, for pairs too wide to pack into one word.
pub struct SplitSlot {
    key: AtomicU64,
    value: AtomicU64,
}

impl SplitSlot {
    pub fn new(empty_key_bits: u64, empty_value_bits: u64) -> Self {
        Self {
            key: AtomicU64::new(empty_key_bits),
            value: AtomicU64::new(empty_value_bits),
        }
    }

    #[inline]
    pub fn load_key(&self) -> u64 {
        self.key.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn load_value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Two-cell claim attempt, dispatching to the back-to-back (§4.3b) or
    /// CAS-then-store (§4.3c) state machine.
    pub fn try_claim(
        &self,
        key_bits: u64,
        value_bits: u64,
        empty_key_bits: u64,
        empty_value_bits: u64,
        capability: CasCapability,
        key_matches: impl Fn(u64) -> bool,
    ) -> InsertOutcome {
        match capability {
            CasCapability::CasThenStore => {
                match self.key.compare_exchange(
                    empty_key_bits,
                    key_bits,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        self.value.store(value_bits, Ordering::Relaxed);
                        InsertOutcome::Success
                    }
                    Err(observed_key) => {
                        if key_matches(observed_key) {
                            InsertOutcome::Duplicate
                        } else {
                            InsertOutcome::Continue
                        }
                    }
                }
            }
            CasCapability::BackToBack => {
                let key_cas = self.key.compare_exchange(
                    empty_key_bits,
                    key_bits,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                );
                let value_cas = self.value.compare_exchange(
                    empty_value_bits,
                    value_bits,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                );
                match (key_cas, value_cas) {
                    (Ok(_), Ok(_)) => InsertOutcome::Success,
                    (Ok(_), Err(_)) => {
                        // Our key won but another in-flight insert's stale
                        // value CAS raced us on the value cell. Nobody else
                        // can claim this value cell for a different key
                        // (the key cell is already ours), so retry until it
                        // is ours.
                        loop {
                            if self
                                .value
                                .compare_exchange(
                                    empty_value_bits,
                                    value_bits,
                                    Ordering::Relaxed,
                                    Ordering::Relaxed,
                                )
                                .is_ok()
                            {
                                break InsertOutcome::Success;
                            }
                        }
                    }
                    (Err(observed_key), Ok(_)) => {
                        // Revert: the value cell is not occupied by anyone
                        // else's data yet, since readers only trust a value
                        // after observing a matching key.
                        self.value.store(empty_value_bits, Ordering::Relaxed);
                        if key_matches(observed_key) {
                            InsertOutcome::Duplicate
                        } else {
                            InsertOutcome::Continue
                        }
                    }
                    (Err(observed_key), Err(_)) => {
                        if key_matches(observed_key) {
                            InsertOutcome::Duplicate
                        } else {
                            InsertOutcome::Continue
                        }
                    }
                }
            }
        }
    }
}
