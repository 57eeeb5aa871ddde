// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error handling (§7): construction and launch/transfer failures surface
//! as a hand-written enum implementing `std::error::Error`, a plain
//! variant-per-failure-mode shape rather than pulling in `thiserror` for
//! two variants.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced from construction or from a bulk launch.
#[derive(Debug)]
pub enum Error {
    /// Slot-array allocation failed.
    Allocation(String),
    /// A worker-pool launch could not be scheduled or joined.
    Launch(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Allocation(msg) => write!(f, "slot array allocation failed: {msg}"),
            Error::Launch(msg) => write!(f, "parallel launch failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
