//! Adapter combinators over `Direct` streams
//!
//! Each adapter is a plain struct wrapping its upstream, so chains of
//! combinators monomorphize into one flat step function.

use std::future::Future;

use braid_common::Result;

use crate::fold::Fold;
use crate::stream::{Direct, Step};

/// Stream returned by [`Direct::map`].
pub struct Map<D, F> {
    pub(crate) inner: D,
    pub(crate) f: F,
}

impl<D, F, U> Direct for Map<D, F>
where
    D: Direct,
    U: Send,
    F: FnMut(D::Item) -> U + Send,
{
    type Item = U;

    async fn step(&mut self) -> Result<Step<U>> {
        Ok(self.inner.step().await?.map(&mut self.f))
    }
}

/// Stream returned by [`Direct::then`].
pub struct Then<D, F> {
    pub(crate) inner: D,
    pub(crate) f: F,
}

impl<D, F, Fut, U> Direct for Then<D, F>
where
    D: Direct,
    U: Send,
    F: FnMut(D::Item) -> Fut + Send,
    Fut: Future<Output = Result<U>> + Send,
{
    type Item = U;

    async fn step(&mut self) -> Result<Step<U>> {
        match self.inner.step().await? {
            Step::Yield(x) => Ok(Step::Yield((self.f)(x).await?)),
            Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::filter`].
pub struct Filter<D, F> {
    pub(crate) inner: D,
    pub(crate) pred: F,
}

impl<D, F> Direct for Filter<D, F>
where
    D: Direct,
    F: FnMut(&D::Item) -> bool + Send,
{
    type Item = D::Item;

    async fn step(&mut self) -> Result<Step<D::Item>> {
        match self.inner.step().await? {
            Step::Yield(x) if (self.pred)(&x) => Ok(Step::Yield(x)),
            Step::Yield(_) | Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::filter_async`].
pub struct FilterAsync<D, F> {
    pub(crate) inner: D,
    pub(crate) pred: F,
}

impl<D, F, Fut> Direct for FilterAsync<D, F>
where
    D: Direct,
    F: FnMut(&D::Item) -> Fut + Send,
    Fut: Future<Output = Result<bool>> + Send,
{
    type Item = D::Item;

    async fn step(&mut self) -> Result<Step<D::Item>> {
        match self.inner.step().await? {
            Step::Yield(x) => {
                if (self.pred)(&x).await? {
                    Ok(Step::Yield(x))
                } else {
                    Ok(Step::Skip)
                }
            }
            Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::take`].
pub struct Take<D> {
    pub(crate) inner: D,
    pub(crate) remaining: usize,
}

impl<D> Direct for Take<D>
where
    D: Direct,
{
    type Item = D::Item;

    async fn step(&mut self) -> Result<Step<D::Item>> {
        if self.remaining == 0 {
            return Ok(Step::Stop);
        }
        match self.inner.step().await? {
            Step::Yield(x) => {
                self.remaining -= 1;
                Ok(Step::Yield(x))
            }
            Step::Skip => Ok(Step::Skip),
            Step::Stop => {
                self.remaining = 0;
                Ok(Step::Stop)
            }
        }
    }
}

/// Stream returned by [`Direct::take_while`].
pub struct TakeWhile<D, F> {
    pub(crate) inner: D,
    pub(crate) pred: F,
    pub(crate) done: bool,
}

impl<D, F> Direct for TakeWhile<D, F>
where
    D: Direct,
    F: FnMut(&D::Item) -> bool + Send,
{
    type Item = D::Item;

    async fn step(&mut self) -> Result<Step<D::Item>> {
        if self.done {
            return Ok(Step::Stop);
        }
        match self.inner.step().await? {
            Step::Yield(x) if (self.pred)(&x) => Ok(Step::Yield(x)),
            Step::Yield(_) | Step::Stop => {
                self.done = true;
                Ok(Step::Stop)
            }
            Step::Skip => Ok(Step::Skip),
        }
    }
}

/// Stream returned by [`Direct::skip`].
pub struct Skip<D> {
    pub(crate) inner: D,
    pub(crate) remaining: usize,
}

impl<D> Direct for Skip<D>
where
    D: Direct,
{
    type Item = D::Item;

    async fn step(&mut self) -> Result<Step<D::Item>> {
        match self.inner.step().await? {
            Step::Yield(x) => {
                if self.remaining == 0 {
                    Ok(Step::Yield(x))
                } else {
                    self.remaining -= 1;
                    Ok(Step::Skip)
                }
            }
            Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::skip_while`].
pub struct SkipWhile<D, F> {
    pub(crate) inner: D,
    pub(crate) pred: F,
    pub(crate) dropping: bool,
}

impl<D, F> Direct for SkipWhile<D, F>
where
    D: Direct,
    F: FnMut(&D::Item) -> bool + Send,
{
    type Item = D::Item;

    async fn step(&mut self) -> Result<Step<D::Item>> {
        match self.inner.step().await? {
            Step::Yield(x) => {
                if self.dropping && (self.pred)(&x) {
                    Ok(Step::Skip)
                } else {
                    self.dropping = false;
                    Ok(Step::Yield(x))
                }
            }
            Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::zip_with`].
pub struct ZipWith<L, R, F>
where
    L: Direct,
{
    pub(crate) left: L,
    pub(crate) right: R,
    pub(crate) f: F,
    /// Element pulled from the left side, awaiting a partner.
    pub(crate) pending: Option<L::Item>,
}

impl<L, R, F, V> Direct for ZipWith<L, R, F>
where
    L: Direct,
    R: Direct,
    V: Send,
    F: FnMut(L::Item, R::Item) -> V + Send,
{
    type Item = V;

    async fn step(&mut self) -> Result<Step<V>> {
        if self.pending.is_none() {
            match self.left.step().await? {
                Step::Yield(x) => self.pending = Some(x),
                Step::Skip => return Ok(Step::Skip),
                Step::Stop => return Ok(Step::Stop),
            }
        }
        match self.right.step().await? {
            Step::Yield(y) => {
                let x = self.pending.take().expect("pending element");
                Ok(Step::Yield((self.f)(x, y)))
            }
            Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::concat_map`].
pub struct ConcatMap<D, I, F> {
    pub(crate) outer: D,
    pub(crate) f: F,
    pub(crate) inner: Option<I>,
}

impl<D, I, F> Direct for ConcatMap<D, I, F>
where
    D: Direct,
    I: Direct,
    F: FnMut(D::Item) -> I + Send,
{
    type Item = I::Item;

    async fn step(&mut self) -> Result<Step<I::Item>> {
        if let Some(inner) = &mut self.inner {
            match inner.step().await? {
                Step::Yield(x) => return Ok(Step::Yield(x)),
                Step::Skip => return Ok(Step::Skip),
                Step::Stop => self.inner = None,
            }
        }
        match self.outer.step().await? {
            Step::Yield(x) => {
                self.inner = Some((self.f)(x));
                Ok(Step::Skip)
            }
            Step::Skip => Ok(Step::Skip),
            Step::Stop => Ok(Step::Stop),
        }
    }
}

/// Stream returned by [`Direct::groups_of`].
///
/// One step consumes a whole chunk from the upstream; the granularity of
/// the output is one folded group per yield.
pub struct GroupsOf<D, F> {
    pub(crate) inner: D,
    pub(crate) n: usize,
    pub(crate) fold: F,
    pub(crate) finished: bool,
}

impl<D, F> Direct for GroupsOf<D, F>
where
    D: Direct,
    F: Fold<Item = D::Item>,
{
    type Item = F::Output;

    async fn step(&mut self) -> Result<Step<F::Output>> {
        if self.finished {
            return Ok(Step::Stop);
        }
        let mut acc = self.fold.initial();
        let mut count = 0;
        while count < self.n {
            match self.inner.step().await? {
                Step::Yield(x) => {
                    acc = self.fold.step(acc, x)?;
                    count += 1;
                }
                Step::Skip => continue,
                Step::Stop => {
                    self.finished = true;
                    if count == 0 {
                        return Ok(Step::Stop);
                    }
                    break;
                }
            }
        }
        Ok(Step::Yield(self.fold.done(acc)?))
    }
}
