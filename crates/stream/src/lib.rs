//! Continuation-form streams and the SVar merge scheduler
//!
//! This crate is the composition layer of braid. A [`Stream`] is a lazy,
//! one-shot step function: advancing it produces nothing, a single final
//! element, or an element plus a tail stream. Serial operators walk that
//! structure directly; the parallel merge operators hand branches to an
//! [`SVar`] (a bounded buffer plus worker scheduler) and read the merged
//! output back as an ordinary stream.
//!
//! The four merge disciplines:
//!
//! - [`serial`]: all of the left stream, then all of the right. No
//!   concurrency, no buffering.
//! - [`interleave`]: strict round-robin between the two sides.
//! - [`coparallel`]: demand-driven concurrency. The left branch runs
//!   first; further workers are dispatched only when buffered output is
//!   drained, so a slow consumer keeps at most one producer busy.
//! - [`parallel`]: fair concurrency. Every branch gets a worker up front
//!   and the work queue is serviced round-robin.
//!
//! Tight inner loops belong in `braid-direct`; [`bridge`] converts in both
//! directions.

pub mod bridge;
pub mod merge;
pub mod stream;
pub mod svar;

pub use braid_common::{Result, SVarConfig, StreamError};
pub use bridge::{from_direct, from_unfold, to_direct};
pub use merge::{
    coparallel, coparallel_with, interleave, parallel, parallel_with, serial, zip_with_parallel,
};
pub use stream::{Next, Stream};
pub use svar::{Phase, SVar, Sched, Style, Tag};
