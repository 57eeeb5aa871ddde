// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Randomized invariant tests (§8) over arbitrary key/value streams and
//! capacities, using `quickcheck` the way the retrieval pack's
//! `ChainSafe-forest` dependency brings it in.

use quickcheck_macros::quickcheck;
use static_map::{StaticMap, StaticMultiMap, Stream};
use std::collections::{HashMap, HashSet};

/// Uniqueness: after inserting arbitrary pairs with duplicate keys, every
/// distinct key occupies at most one slot — so the table's size equals
/// the number of distinct keys attempted, never more (two slots for the
/// same key) and never less (a key silently lost).
#[quickcheck]
fn map_uniqueness_holds(pairs: Vec<(i16, i16)>) -> bool {
    if pairs.len() > 400 {
        return true; // keep the shrinker and runtime bounded
    }
    let stream = Stream::new();
    let map: StaticMap<i32, i32> = StaticMap::new(4096, -1, -1, &stream);
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, _)| *k as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    map.insert(&items, &stream);

    let distinct_keys: HashSet<i32> = items.iter().map(|&(k, _)| k).collect();
    if map.get_size() != distinct_keys.len() {
        return false;
    }
    for &k in &distinct_keys {
        if !map.contains(&[k], &stream)[0] {
            return false;
        }
    }
    true
}

/// Persistence: once `find(k)` returns a non-empty slot, every later
/// `find(k)` returns the same value.
#[quickcheck]
fn map_find_is_persistent(pairs: Vec<(i16, i16)>) -> bool {
    if pairs.len() > 400 {
        return true;
    }
    let stream = Stream::new();
    let map: StaticMap<i32, i32> = StaticMap::new(4096, -1, -1, &stream);
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, _)| *k as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    map.insert(&items, &stream);

    let keys: Vec<i32> = items.iter().map(|&(k, _)| k).collect();
    let first = map.find(&keys, &stream);
    let second = map.find(&keys, &stream);
    first == second
}

/// Round-trip: every inserted key is findable with a value that was
/// actually attached to it by some insert call, and every key never
/// inserted is absent.
#[quickcheck]
fn map_round_trip(pairs: Vec<(i16, i16)>, probes: Vec<i16>) -> bool {
    if pairs.len() > 300 || probes.len() > 300 {
        return true;
    }
    let stream = Stream::new();
    let map: StaticMap<i32, i32> = StaticMap::new(4096, -1, -1, &stream);

    let mut by_key: HashMap<i32, HashSet<i32>> = HashMap::new();
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, _)| *k as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    for &(k, v) in &items {
        by_key.entry(k).or_default().insert(v);
    }
    map.insert(&items, &stream);

    for p in probes {
        let key = p as i32;
        if key == -1 {
            continue;
        }
        let found = map.contains(&[key], &stream)[0];
        let should_be_present = by_key.contains_key(&key);
        if found != should_be_present {
            return false;
        }
        if found {
            let value = map.find(&[key], &stream)[0];
            if !by_key[&key].contains(&value) {
                return false;
            }
        }
    }
    true
}

/// Size consistency (multimap): `get_size()` equals the number of inserts
/// issued, given sufficient capacity.
#[quickcheck]
fn multimap_size_equals_insert_count(pairs: Vec<(i16, i16)>) -> bool {
    if pairs.len() > 400 {
        return true;
    }
    let stream = Stream::new();
    let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(8192, -1, -1, &stream);
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, _)| *k as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    map.insert(&items, &stream);
    map.get_size() == items.len()
}

/// Outer match count law: `count_outer(Q) = count(Q) + |{q in Q :
/// count({q}) = 0}|`.
#[quickcheck]
fn multimap_outer_match_count_law(pairs: Vec<(i16, i16)>, probes: Vec<i16>) -> bool {
    if pairs.len() > 300 || probes.len() > 64 {
        return true;
    }
    let stream = Stream::new();
    let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(8192, -1, -1, &stream);
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, _)| *k as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    map.insert(&items, &stream);

    let probe_keys: Vec<i32> = probes
        .iter()
        .filter(|p| **p as i32 != -1)
        .map(|&p| p as i32)
        .collect();
    if probe_keys.is_empty() {
        return true;
    }

    let count = map.count(&probe_keys, &stream).wait();
    let outer = map.count_outer(&probe_keys, &stream).wait();
    let zero_match_probes = probe_keys
        .iter()
        .filter(|&&k| map.count(&[k], &stream).wait() == 0)
        .count();
    outer == count + zero_match_probes
}

/// Retrieve/count agreement: `retrieve(Q)` returns exactly `count(Q)`
/// pairs.
#[quickcheck]
fn multimap_retrieve_matches_count(pairs: Vec<(i16, i16)>, probes: Vec<i16>) -> bool {
    if pairs.len() > 300 || probes.len() > 64 {
        return true;
    }
    let stream = Stream::new();
    let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(8192, -1, -1, &stream);
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, _)| *k as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    map.insert(&items, &stream);

    let probe_keys: Vec<i32> = probes
        .iter()
        .filter(|p| **p as i32 != -1)
        .map(|&p| p as i32)
        .collect();
    if probe_keys.is_empty() {
        return true;
    }

    let expected = map.count(&probe_keys, &stream).wait();
    let mut out = vec![-1i32; expected.max(1) * 2 + 16];
    let written = map.retrieve(&probe_keys, &mut out, &stream);
    written == expected
}

/// `find`/`contains` agreement, which only holds if the no-hole invariant
/// (§3, §8) keeps `find`'s early-exit-on-empty-window from masking a key
/// that `contains` would otherwise have walked past: for every key, either
/// both report absent, or `find` returns a value `contains` also reports
/// present for.
#[quickcheck]
fn map_find_and_contains_agree(pairs: Vec<(i16, i16)>, probes: Vec<i16>) -> bool {
    if pairs.len() > 300 || probes.len() > 300 {
        return true;
    }
    let stream = Stream::new();
    let capacity = 4096usize;
    let map: StaticMap<i32, i32> = StaticMap::new(capacity, -1, -1, &stream);
    let items: Vec<(i32, i32)> = pairs
        .iter()
        .filter(|(k, v)| *k as i32 != -1 && *v as i32 != -1)
        .map(|&(k, v)| (k as i32, v as i32))
        .collect();
    map.insert(&items, &stream);

    for p in probes {
        let key = p as i32;
        if key == -1 {
            continue;
        }
        let present = map.contains(&[key], &stream)[0];
        let value = map.find(&[key], &stream)[0];
        if present == (value == -1) {
            return false;
        }
    }
    true
}
