// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Probe sequence (C2): a pure, cheap-to-copy function from `(key hash,
//! attempt) -> slot index`, plus a windowed form used by the cooperative
//! group protocol of [`crate::group`].
//!
//! Every table rounds its capacity up to a multiple of its configured
//! group width so that windows always tile the slot array exactly, with no
//! partial window at the wrap-around point. This generalizes the
//! multimap-only rounding rule in the component design to the map as well,
//! since both now share the same windowed-probe machinery; see `DESIGN.md`.

/// A probe sequence, parameterized over the group width so that a window
/// of `group_size` consecutive, aligned slots can always be produced.
pub trait ProbeSequence: Clone + Send + Sync + 'static {
    /// Start of the first window probed for `hash`, a multiple of
    /// `group_size`.
    fn initial_window(&self, hash: u64, capacity: usize, group_size: usize) -> usize;

    /// Start of the window probed after `window_start`.
    fn next_window(
        &self,
        hash: u64,
        window_start: usize,
        capacity: usize,
        group_size: usize,
    ) -> usize;
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// `h_{i+1} = (h_i + 1) mod capacity`, lifted to window granularity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Linear;

impl ProbeSequence for Linear {
    fn initial_window(&self, hash: u64, capacity: usize, group_size: usize) -> usize {
        let num_windows = (capacity / group_size).max(1);
        ((hash as usize) % num_windows) * group_size
    }

    fn next_window(
        &self,
        _hash: u64,
        window_start: usize,
        capacity: usize,
        group_size: usize,
    ) -> usize {
        let num_windows = (capacity / group_size).max(1);
        let cur = window_start / group_size;
        ((cur + 1) % num_windows) * group_size
    }
}

/// `h_{i+1} = (h_i + step(key)) mod capacity`, with `step` nonzero and
/// coprime with the window-index space so every window is eventually
/// visited before the sequence repeats.
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleHashing;

impl DoubleHashing {
    fn step(hash: u64, num_windows: usize) -> usize {
        if num_windows <= 1 {
            return 1;
        }
        let mixed = hash.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17);
        let mut s = ((mixed as usize) % (num_windows - 1)) + 1;
        while gcd(s, num_windows) != 1 {
            s += 1;
            if s >= num_windows {
                s = 1;
            }
        }
        s
    }
}

impl ProbeSequence for DoubleHashing {
    fn initial_window(&self, hash: u64, capacity: usize, group_size: usize) -> usize {
        let num_windows = (capacity / group_size).max(1);
        ((hash as usize) % num_windows) * group_size
    }

    fn next_window(
        &self,
        hash: u64,
        window_start: usize,
        capacity: usize,
        group_size: usize,
    ) -> usize {
        let num_windows = (capacity / group_size).max(1);
        let cur = window_start / group_size;
        let step = Self::step(hash, num_windows);
        ((cur + step) % num_windows) * group_size
    }
}

/// Round `capacity` up to the nearest positive multiple of `group_size`,
/// clamping zero capacity to one full group.
pub fn round_capacity(capacity: usize, group_size: usize) -> usize {
    let group_size = group_size.max(1);
    let capacity = capacity.max(1);
    let windows = capacity.div_ceil(group_size).max(1);
    windows * group_size
}
