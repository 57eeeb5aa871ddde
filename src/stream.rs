// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bulk host APIs drive work on a [`Stream`] (§5, §6). For operations that
//! report a count, a [`CountFuture`] is returned instead of forcing a
//! synchronous wait inline, resolving the open question in the component
//! design notes in favor of providing the awaitable shape.
//!
//! There is no real device/host asynchrony once this crate's work is
//! dispatched onto CPU threads; `Stream` exists so call sites read the way
//! they would against an asynchronous backend, and to give every bulk call
//! one obvious place to hang a future "does this actually overlap with
//! other streams" policy, without threading a raw thread pool handle
//! through every public function today.

use crossbeam_channel::{bounded, Receiver};

/// Host-visible handle standing in for an asynchronous compute stream.
#[derive(Default)]
pub struct Stream;

impl Stream {
    pub fn new() -> Self {
        Self
    }

    /// Run `f` to completion using this stream's worker pool.
    pub fn launch<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        rayon::scope(|_| f())
    }
}

/// An outstanding count result from a bulk operation that reports one
/// (`count`, `pair_count`, and their outer variants).
pub struct CountFuture {
    rx: Receiver<usize>,
}

impl CountFuture {
    pub(crate) fn spawn(f: impl FnOnce() -> usize + Send + 'static) -> Self {
        let (tx, rx) = bounded(1);
        rayon::spawn(move || {
            let _ = tx.send(f());
        });
        Self { rx }
    }

    /// Block until the stream synchronizes and the count is available.
    pub fn wait(self) -> usize {
        self.rx
            .recv()
            .expect("count producer dropped without sending")
    }

    /// Non-blocking poll; `None` if the launch has not completed yet.
    pub fn try_get(&self) -> Option<usize> {
        self.rx.try_recv().ok()
    }
}
