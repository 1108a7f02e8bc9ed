//! Direct stream sources

use std::ops::Add;

use braid_common::Result;

use crate::stream::{Direct, Step};

/// Stream over any iterator.
pub fn from_iter<I>(iter: I) -> FromIter<I::IntoIter>
where
    I: IntoIterator,
{
    FromIter {
        iter: iter.into_iter(),
    }
}

pub struct FromIter<I> {
    iter: I,
}

impl<I> Direct for FromIter<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Item = I::Item;

    async fn step(&mut self) -> Result<Step<I::Item>> {
        Ok(match self.iter.next() {
            Some(x) => Step::Yield(x),
            None => Step::Stop,
        })
    }
}

/// Stream pulled from a fallible generator; `Ok(None)` ends the stream.
pub fn from_fn<T, F>(f: F) -> FromFn<F>
where
    T: Send,
    F: FnMut() -> Result<Option<T>> + Send,
{
    FromFn { f, done: false }
}

pub struct FromFn<F> {
    f: F,
    done: bool,
}

impl<T, F> Direct for FromFn<F>
where
    T: Send,
    F: FnMut() -> Result<Option<T>> + Send,
{
    type Item = T;

    async fn step(&mut self) -> Result<Step<T>> {
        if self.done {
            return Ok(Step::Stop);
        }
        match (self.f)()? {
            Some(x) => Ok(Step::Yield(x)),
            None => {
                self.done = true;
                Ok(Step::Stop)
            }
        }
    }
}

/// The infinite arithmetic sequence `from, from + by, from + 2*by, ...`.
///
/// Pair with [`Direct::take`] or [`Direct::take_while`] for a finite view.
pub fn enumerate_from_step<T>(from: T, by: T) -> EnumerateFromStep<T>
where
    T: Copy + Add<Output = T> + Send,
{
    EnumerateFromStep { next: from, by }
}

pub struct EnumerateFromStep<T> {
    next: T,
    by: T,
}

impl<T> Direct for EnumerateFromStep<T>
where
    T: Copy + Add<Output = T> + Send,
{
    type Item = T;

    async fn step(&mut self) -> Result<Step<T>> {
        let x = self.next;
        self.next = x + self.by;
        Ok(Step::Yield(x))
    }
}
