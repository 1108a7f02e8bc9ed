//! Direct-form streams
//!
//! This crate provides the inner-loop stream representation: a state
//! machine advanced one step at a time, where each step yields an element,
//! skips (the state advanced but produced nothing), or stops. Combinators
//! are plain adapter structs composed by monomorphization, so a
//! `map`/`filter`/`take` chain compiles down to a single loop body.
//!
//! Evaluation here is strictly single-threaded and lock-free. Concurrent
//! merging lives in `braid-stream`, which bridges to and from this form.
//!
//! The crate also carries [`Unfold`], a first-class producer value with
//! covariant/contravariant composition and resource-safe bracket scoping.

pub mod adapters;
pub mod bracket;
pub mod drive;
pub mod fold;
pub mod sources;
pub mod stream;
pub mod unfold;


pub use braid_common::{Result, StreamError};
pub use bracket::{bracket, finally, Bracket, Finally};
pub use drive::{cmp_by, drain, eq_by, fold, fold_async, next, to_vec};
pub use fold::{Collect, Count, Fold, Sum};
pub use sources::{enumerate_from_step, from_fn, from_iter};
pub use stream::{Direct, Step};
pub use unfold::{unfold, FnUnfold, Unfold, UnfoldStep, UnfoldStream};
