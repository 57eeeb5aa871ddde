// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative group protocol (C4): the group-wide algorithm for collective
//! insert/find/contains/count/retrieve within a probing window.
//!
//! A "group" of `group_size` lanes is conceptually a set of cooperating
//! scanners sharing one probing window, the way a SIMT warp would exchange
//! state through ballot/shuffle. On a CPU there is no lockstep hardware to
//! borrow, so each group here is simulated as a short sequential scan over
//! its window, run by whichever worker thread is driving that probe (see
//! `SPEC_FULL.md` §0). The decision rules:
//!
//! - *Insert (unique keys)*: scan the window for an existing equal key
//!   (duplicate) and for the first empty lane; an existing match wins over
//!   an empty lane; the first empty lane runs the single-worker slot
//!   protocol of [`crate::slot`]; `Continue` restarts the scan on the same
//!   window.
//! - *Find/contains*: scan the window for an equal key; if none, an empty
//!   lane proves absence; otherwise advance to the next window.
//! - *Count/retrieve*: same scan, but collects every match in the window
//!   (not just the first) before stopping at the first empty lane, since
//!   the no-hole invariant guarantees no instance of a key can appear past
//!   an empty slot on that key's own probe sequence.
//!
//! `group_size == 1` degenerates exactly to the single-worker protocol with
//! no window machinery, which is how the unique-key map's default
//! configuration runs.

use crate::backing::Backing;
use crate::probe::ProbeSequence;
use crate::slot::InsertOutcome;

/// Insert into a table with unique keys (§4.4 Insert). Returns `true` if
/// this call's pair was newly inserted, `false` if an equal key already
/// occupied some slot.
pub fn group_insert_unique(
    backing: &Backing,
    probe: &impl ProbeSequence,
    group_size: usize,
    hash: u64,
    key_bits: u64,
    value_bits: u64,
    key_matches: impl Fn(u64) -> bool,
) -> bool {
    let capacity = backing.capacity();
    let mut window = probe.initial_window(hash, capacity, group_size);
    loop {
        let mut duplicate = false;
        let mut first_empty = None;
        for lane in 0..group_size {
            let idx = window + lane;
            let existing = backing.load_key_bits(idx);
            if backing.is_empty_key(existing) {
                if first_empty.is_none() {
                    first_empty = Some(idx);
                }
            } else if key_matches(existing) {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            return false;
        }
        if let Some(idx) = first_empty {
            match backing.try_claim(idx, key_bits, value_bits, &key_matches) {
                InsertOutcome::Success => return true,
                InsertOutcome::Duplicate => return false,
                InsertOutcome::Continue => continue,
            }
        }
        window = probe.next_window(hash, window, capacity, group_size);
    }
}

/// Insert into a table that permits duplicate keys (§4.4 Insert, multimap
/// form: no duplicate pre-check, claim the first empty lane found). Loops
/// forever if the table has no remaining empty slot, matching the
/// documented (not enforced) full-table contract in §4.7.
pub fn group_insert_multi(
    backing: &Backing,
    probe: &impl ProbeSequence,
    group_size: usize,
    hash: u64,
    key_bits: u64,
    value_bits: u64,
) {
    let capacity = backing.capacity();
    let mut window = probe.initial_window(hash, capacity, group_size);
    loop {
        let mut first_empty = None;
        for lane in 0..group_size {
            let idx = window + lane;
            if backing.is_empty_key(backing.load_key_bits(idx)) {
                first_empty = Some(idx);
                break;
            }
        }
        if let Some(idx) = first_empty {
            // `key_matches` always false: a lost race on this slot never
            // means "duplicate" for a multimap, just "try again".
            match backing.try_claim(idx, key_bits, value_bits, |_| false) {
                InsertOutcome::Success => return,
                _ => continue,
            }
        }
        window = probe.next_window(hash, window, capacity, group_size);
    }
}

/// Find the first slot matching `key_matches` (§4.4 Find/contains). A full
/// pass over every window without a match or an empty lane proves absence;
/// the no-hole invariant guarantees the probe sequence is a permutation of
/// the window-index space, so this bound never masks a real match.
pub fn group_find(
    backing: &Backing,
    probe: &impl ProbeSequence,
    group_size: usize,
    hash: u64,
    key_matches: impl Fn(u64) -> bool,
) -> Option<usize> {
    let capacity = backing.capacity();
    let num_windows = (capacity / group_size).max(1);
    let mut window = probe.initial_window(hash, capacity, group_size);
    for _ in 0..num_windows {
        let mut match_idx = None;
        let mut saw_empty = false;
        for lane in 0..group_size {
            let idx = window + lane;
            let existing = backing.load_key_bits(idx);
            if backing.is_empty_key(existing) {
                saw_empty = true;
            } else if key_matches(existing) {
                match_idx = Some(idx);
                break;
            }
        }
        if let Some(idx) = match_idx {
            return Some(idx);
        }
        if saw_empty {
            return None;
        }
        window = probe.next_window(hash, window, capacity, group_size);
    }
    None
}

/// Visit every slot matching `key_matches`, stopping at the first empty
/// lane encountered (§4.4 Count/pair_count, §4.5 Retrieve). Returns the
/// number of matches visited.
pub fn group_for_each_match(
    backing: &Backing,
    probe: &impl ProbeSequence,
    group_size: usize,
    hash: u64,
    key_matches: impl Fn(u64) -> bool,
    mut visit: impl FnMut(u64, u64),
) -> usize {
    let capacity = backing.capacity();
    let num_windows = (capacity / group_size).max(1);
    let mut window = probe.initial_window(hash, capacity, group_size);
    let mut matches = 0usize;
    for _ in 0..num_windows {
        let mut saw_empty = false;
        for lane in 0..group_size {
            let idx = window + lane;
            let (k, v) = backing.load_pair_bits(idx);
            if backing.is_empty_key(k) {
                saw_empty = true;
                continue;
            }
            if key_matches(k) {
                visit(k, v);
                matches += 1;
            }
        }
        if saw_empty {
            break;
        }
        window = probe.next_window(hash, window, capacity, group_size);
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::{Backing, DefaultAllocator};
    use crate::probe::{round_capacity, Linear};
    use crate::slot::CasCapability;

    fn fresh(capacity: usize, group_size: usize) -> Backing {
        let capacity = round_capacity(capacity, group_size);
        Backing::new_split(&DefaultAllocator, capacity, u64::MAX, u64::MAX, CasCapability::BackToBack)
    }

    #[test]
    fn unique_insert_then_duplicate_rejected() {
        let backing = fresh(64, 4);
        let probe = Linear;
        assert!(group_insert_unique(&backing, &probe, 4, 10, 10, 100, |k| k == 10));
        assert!(!group_insert_unique(&backing, &probe, 4, 10, 10, 999, |k| k == 10));
    }

    #[test]
    fn find_after_insert() {
        let backing = fresh(64, 4);
        let probe = Linear;
        assert!(group_insert_unique(&backing, &probe, 4, 5, 5, 50, |k| k == 5));
        let idx = group_find(&backing, &probe, 4, 5, |k| k == 5).expect("present");
        assert_eq!(backing.load_pair_bits(idx).1, 50);
        assert!(group_find(&backing, &probe, 4, 7, |k| k == 7).is_none());
    }

    #[test]
    fn multimap_counts_all_duplicates() {
        let backing = fresh(64, 4);
        let probe = Linear;
        for i in 0..5u64 {
            group_insert_multi(&backing, &probe, 4, 3, 3, 100 + i);
        }
        let mut values = Vec::new();
        let matches = group_for_each_match(&backing, &probe, 4, 3, |k| k == 3, |_, v| values.push(v));
        assert_eq!(matches, 5);
        values.sort_unstable();
        assert_eq!(values, vec![100, 101, 102, 103, 104]);
    }
}
