// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-capacity concurrent open-addressing hash map and multimap.
//!
//! Two table types sit on top of a shared slot/probe/group/buffer stack:
//!
//! - [`map::StaticMap`] — unique keys, insert rejects duplicates.
//! - [`multimap::StaticMultiMap`] — duplicate keys permitted, with
//!   count/retrieve operations and left-join ("outer") variants.
//!
//! Both are constructed once at a fixed capacity and never resize, never
//! delete, and never rehash; growing past capacity is the caller's
//! responsibility (build a bigger table and re-insert). Concurrent bulk
//! operations are driven through a [`stream::Stream`], and operations that
//! report a count return a [`stream::CountFuture`] rather than blocking
//! inline.
//!
//! ```
//! use static_map::{map::StaticMap, stream::Stream};
//!
//! let stream = Stream::new();
//! let table: StaticMap<i32, i32> = StaticMap::new(1024, -1, -1, &stream);
//! table.insert(&[(1, 100), (2, 200)], &stream);
//! assert_eq!(table.find(&[1, 3], &stream), vec![100, -1]);
//! ```

pub mod backing;
pub mod buffer;
pub mod config;
pub mod error;
pub mod group;
pub mod hash;
pub mod map;
pub mod multimap;
pub mod probe;
pub mod scalar;
pub mod slot;
pub mod stream;
pub mod view;

pub use config::LaunchConfig;
pub use error::{Error, Result};
pub use map::StaticMap;
pub use multimap::StaticMultiMap;
pub use probe::{DoubleHashing, Linear, ProbeSequence};
pub use scalar::{Key, Value};
pub use stream::{CountFuture, Stream};
