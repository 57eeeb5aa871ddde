// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retrieval buffering (C6): stage matches in a small per-group buffer,
//! reserve a contiguous range of the shared output with one atomic
//! fetch-add, then flush. This is the mechanism that keeps the match
//! counter off the hot path: without it every single match would contend
//! on one shared cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// A disjoint-range output target shared (read-only, except for the
/// reserved range each writer owns) across worker threads.
///
/// # Safety
///
/// Every write through [`ScatterSlice::write_at`] must target an offset
/// the caller exclusively reserved via a [`MatchCounter`], and must be
/// within the slice's length. The bulk-operation layer upholds this by
/// sizing the destination to a prior `count()` result before calling a
/// retrieve variant, per the external interface contract.
pub struct ScatterSlice<T> {
    ptr: *mut T,
    len: usize,
}

unsafe impl<T: Send> Send for ScatterSlice<T> {}
unsafe impl<T: Send> Sync for ScatterSlice<T> {}

impl<T> ScatterSlice<T> {
    pub fn new(slice: &mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
        }
    }

    /// # Safety
    /// `offset` must be `< len()` and must not alias any other concurrent
    /// write in flight.
    pub unsafe fn write_at(&self, offset: usize, value: T) {
        debug_assert!(offset < self.len);
        std::ptr::write(self.ptr.add(offset), value);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Device-wide match/success counter (C7). A fresh instance backs each
/// count-producing bulk call, read back once the launch completes.
///
/// Cache-line padded: every group in a bulk call contends on this one
/// counter's cache line via `fetch_add`, so without padding a table sharing
/// an allocation with other hot data would suffer false sharing on every
/// flush.
#[derive(Default)]
pub struct MatchCounter(CachePadded<AtomicUsize>);

impl MatchCounter {
    pub fn new() -> Self {
        Self(CachePadded::new(AtomicUsize::new(0)))
    }

    /// Reserve `count` contiguous output slots, returning the base offset.
    pub fn reserve(&self, count: usize) -> usize {
        self.0.fetch_add(count, Ordering::Relaxed)
    }

    pub fn load(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-group (or per-flushing-group, for wider vector flushes) output
/// staging buffer.
pub struct GroupBuffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Copy> GroupBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Stage one item, flushing first if the buffer would overflow.
    pub fn push(&mut self, item: T, counter: &MatchCounter, output: &ScatterSlice<T>) {
        if self.items.len() == self.capacity {
            self.flush(counter, output);
        }
        self.items.push(item);
    }

    /// Flush whatever is currently staged. Must also be called once after
    /// the group's probing loop ends, to drain any partial fill.
    pub fn flush(&mut self, counter: &MatchCounter, output: &ScatterSlice<T>) {
        if self.items.is_empty() {
            return;
        }
        let base = counter.reserve(self.items.len());
        for (i, item) in self.items.drain(..).enumerate() {
            // SAFETY: `[base, base + items.len())` was just reserved
            // exclusively for this flush.
            unsafe { output.write_at(base + i, item) };
        }
    }
}
