// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Centralized tunables (§9.4 of `SPEC_FULL.md`), so launch geometry and
//! buffer sizing stay in one place instead of scattered magic numbers
//! through call sites.

/// Launch geometry and buffering knobs for bulk operations.
#[derive(Debug, Clone, Copy)]
pub struct LaunchConfig {
    /// Work items per host-issued block (§4.6: "block size 128").
    pub block_size: usize,
    /// Worker threads used to drive a bulk launch.
    pub worker_count: usize,
    /// Per-group retrieval staging capacity (§4.5).
    pub retrieval_buffer_size: usize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            block_size: 128,
            worker_count: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
            retrieval_buffer_size: 256,
        }
    }
}
