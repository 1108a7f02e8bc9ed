//! The step outcome and the `Direct` trait
//!
//! A direct stream is a state machine: each call to [`Direct::step`]
//! advances the state and reports one of three outcomes. `Skip` is what
//! lets filter, concat, and take say "no element this step" without the
//! driving loop recursing back into itself.

use std::future::Future;

use braid_common::Result;

use crate::adapters::{
    ConcatMap, Filter, FilterAsync, GroupsOf, Map, Skip as SkipItems, SkipWhile, Take, TakeWhile,
    Then, ZipWith,
};
use crate::fold::Fold;

/// Outcome of advancing a direct stream by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// An element is ready.
    Yield(T),
    /// The state advanced without producing an element.
    Skip,
    /// The stream is exhausted. Further steps keep returning `Stop`.
    Stop,
}

impl<T> Step<T> {
    /// Apply `f` to the yielded element, if any.
    pub fn map<U, F>(self, f: F) -> Step<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Step::Yield(x) => Step::Yield(f(x)),
            Step::Skip => Step::Skip,
            Step::Stop => Step::Stop,
        }
    }
}

/// A direct-form stream: internal state plus a step function.
///
/// Steps are async so that effectful sources and the continuation-form
/// bridge fit the same trait; pure adapters never actually suspend.
pub trait Direct: Send + Sized {
    /// Element type produced by this stream.
    type Item: Send;

    /// Advance the stream by one step.
    fn step(&mut self) -> impl Future<Output = Result<Step<Self::Item>>> + Send;

    /// Transform every element with `f`.
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        U: Send,
        F: FnMut(Self::Item) -> U + Send,
    {
        Map { inner: self, f }
    }

    /// Transform every element with an effectful `f`.
    fn then<U, F, Fut>(self, f: F) -> Then<Self, F>
    where
        U: Send,
        F: FnMut(Self::Item) -> Fut + Send,
        Fut: Future<Output = Result<U>> + Send,
    {
        Then { inner: self, f }
    }

    /// Keep only elements satisfying `pred`.
    fn filter<F>(self, pred: F) -> Filter<Self, F>
    where
        F: FnMut(&Self::Item) -> bool + Send,
    {
        Filter { inner: self, pred }
    }

    /// Keep only elements satisfying an effectful `pred`.
    fn filter_async<F, Fut>(self, pred: F) -> FilterAsync<Self, F>
    where
        F: FnMut(&Self::Item) -> Fut + Send,
        Fut: Future<Output = Result<bool>> + Send,
    {
        FilterAsync { inner: self, pred }
    }

    /// Pass through at most `n` elements.
    fn take(self, n: usize) -> Take<Self> {
        Take {
            inner: self,
            remaining: n,
        }
    }

    /// Pass through elements while `pred` holds, then stop.
    fn take_while<F>(self, pred: F) -> TakeWhile<Self, F>
    where
        F: FnMut(&Self::Item) -> bool + Send,
    {
        TakeWhile {
            inner: self,
            pred,
            done: false,
        }
    }

    /// Discard the first `n` elements.
    fn skip(self, n: usize) -> SkipItems<Self> {
        SkipItems {
            inner: self,
            remaining: n,
        }
    }

    /// Discard elements while `pred` holds.
    fn skip_while<F>(self, pred: F) -> SkipWhile<Self, F>
    where
        F: FnMut(&Self::Item) -> bool + Send,
    {
        SkipWhile {
            inner: self,
            pred,
            dropping: true,
        }
    }

    /// Combine with `other` element-wise; stops with the shorter side.
    fn zip_with<O, V, F>(self, other: O, f: F) -> ZipWith<Self, O, F>
    where
        O: Direct,
        V: Send,
        F: FnMut(Self::Item, O::Item) -> V + Send,
    {
        ZipWith {
            left: self,
            right: other,
            f,
            pending: None,
        }
    }

    /// Substitute a stream for each element and concatenate the results.
    fn concat_map<I, F>(self, f: F) -> ConcatMap<Self, I, F>
    where
        I: Direct,
        F: FnMut(Self::Item) -> I + Send,
    {
        ConcatMap {
            outer: self,
            f,
            inner: None,
        }
    }

    /// Re-fold consecutive chunks of `n` elements with `fold`, yielding one
    /// output per chunk. The final chunk may be short.
    fn groups_of<F>(self, n: usize, fold: F) -> GroupsOf<Self, F>
    where
        F: Fold<Item = Self::Item>,
    {
        assert!(n > 0, "group size must be positive");
        GroupsOf {
            inner: self,
            n,
            fold,
            finished: false,
        }
    }
}
