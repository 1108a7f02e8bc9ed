//! Resource-safe scoping for unfolds
//!
//! [`bracket`] acquires a resource before any element is produced and
//! guarantees the release action runs at most once, on the first of:
//! normal stop, an error during the body, or abandonment (the stream state
//! being dropped part-way, including a producer task cancelled by its
//! scheduler). Errors re-raise after the release completes.
//!
//! Release runs through a guard owned by the stream state, so the
//! abandonment path is ordinary drop glue rather than anything the driver
//! has to remember to call.

use std::marker::PhantomData;
use std::sync::Arc;

use braid_common::Result;

use crate::unfold::{Unfold, UnfoldStep};

/// Scope `body` over a resource produced by `before` and released by
/// `after`.
///
/// The resource is the seed of `body`, cloned into it at injection; wrap
/// handles that are not cheaply clonable in an `Arc`. A release failure on
/// the normal path surfaces as an error; on the error and abandonment
/// paths the original outcome wins and the release failure is dropped.
pub fn bracket<S, B, A, U>(before: B, after: A, body: U) -> Bracket<S, B, A, U>
where
    U: Unfold,
    U::Seed: Clone + Send,
    B: FnMut(S) -> Result<U::Seed> + Send,
    A: Fn(U::Seed) -> Result<()> + Send + Sync,
{
    Bracket {
        before,
        after: Arc::new(after),
        inner: body,
        _marker: PhantomData,
    }
}

/// Run `after` when `body` stops, fails, or is abandoned.
pub fn finally<A, U>(after: A, body: U) -> Finally<U, A>
where
    U: Unfold,
    A: Fn() -> Result<()> + Send + Sync,
{
    Finally {
        inner: body,
        after: Arc::new(after),
    }
}

/// Unfold returned by [`bracket`].
pub struct Bracket<S, B, A, U>
where
    U: Unfold,
    A: Fn(U::Seed) -> Result<()>,
{
    before: B,
    after: Arc<A>,
    inner: U,
    _marker: PhantomData<fn(S)>,
}

/// State of a bracketed run: the release guard plus the body's state.
pub struct BracketState<C, St, A>
where
    A: Fn(C) -> Result<()>,
{
    guard: ReleaseGuard<C, A>,
    inner: St,
}

impl<S, B, A, U> Unfold for Bracket<S, B, A, U>
where
    U: Unfold,
    U::Seed: Clone + Send,
    B: FnMut(S) -> Result<U::Seed> + Send,
    A: Fn(U::Seed) -> Result<()> + Send + Sync,
{
    type Seed = S;
    type State = BracketState<U::Seed, U::State, A>;
    type Item = U::Item;

    fn inject(&mut self, seed: S) -> Result<Self::State> {
        let resource = (self.before)(seed)?;
        let inner = match self.inner.inject(resource.clone()) {
            Ok(state) => state,
            Err(e) => {
                let _ = (*self.after)(resource);
                return Err(e);
            }
        };
        Ok(BracketState {
            guard: ReleaseGuard {
                resource: Some(resource),
                after: self.after.clone(),
            },
            inner,
        })
    }

    fn step(&mut self, state: Self::State) -> Result<UnfoldStep<Self::State, U::Item>> {
        let BracketState { mut guard, inner } = state;
        match self.inner.step(inner) {
            Ok(UnfoldStep::Yield(x, s)) => Ok(UnfoldStep::Yield(x, BracketState { guard, inner: s })),
            Ok(UnfoldStep::Skip(s)) => Ok(UnfoldStep::Skip(BracketState { guard, inner: s })),
            Ok(UnfoldStep::Stop) => {
                guard.release()?;
                Ok(UnfoldStep::Stop)
            }
            Err(e) => {
                let _ = guard.release();
                Err(e)
            }
        }
    }
}

/// Unfold returned by [`finally`].
pub struct Finally<U, A>
where
    A: Fn() -> Result<()>,
{
    inner: U,
    after: Arc<A>,
}

/// State of a [`finally`] run.
pub struct FinallyState<St, A>
where
    A: Fn() -> Result<()>,
{
    guard: OnceGuard<A>,
    inner: St,
}

impl<U, A> Unfold for Finally<U, A>
where
    U: Unfold,
    A: Fn() -> Result<()> + Send + Sync,
{
    type Seed = U::Seed;
    type State = FinallyState<U::State, A>;
    type Item = U::Item;

    fn inject(&mut self, seed: U::Seed) -> Result<Self::State> {
        match self.inner.inject(seed) {
            Ok(inner) => Ok(FinallyState {
                guard: OnceGuard {
                    after: Some(self.after.clone()),
                },
                inner,
            }),
            Err(e) => {
                let _ = (*self.after)();
                Err(e)
            }
        }
    }

    fn step(&mut self, state: Self::State) -> Result<UnfoldStep<Self::State, U::Item>> {
        let FinallyState { mut guard, inner } = state;
        match self.inner.step(inner) {
            Ok(UnfoldStep::Yield(x, s)) => Ok(UnfoldStep::Yield(x, FinallyState { guard, inner: s })),
            Ok(UnfoldStep::Skip(s)) => Ok(UnfoldStep::Skip(FinallyState { guard, inner: s })),
            Ok(UnfoldStep::Stop) => {
                guard.fire()?;
                Ok(UnfoldStep::Stop)
            }
            Err(e) => {
                let _ = guard.fire();
                Err(e)
            }
        }
    }
}

/// Owns a resource until released exactly once; drop covers abandonment.
struct ReleaseGuard<C, A>
where
    A: Fn(C) -> Result<()>,
{
    resource: Option<C>,
    after: Arc<A>,
}

impl<C, A> ReleaseGuard<C, A>
where
    A: Fn(C) -> Result<()>,
{
    fn release(&mut self) -> Result<()> {
        match self.resource.take() {
            Some(resource) => (*self.after)(resource),
            None => Ok(()),
        }
    }
}

impl<C, A> Drop for ReleaseGuard<C, A>
where
    A: Fn(C) -> Result<()>,
{
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Fires a release action at most once; drop covers abandonment.
struct OnceGuard<A>
where
    A: Fn() -> Result<()>,
{
    after: Option<Arc<A>>,
}

impl<A> OnceGuard<A>
where
    A: Fn() -> Result<()>,
{
    fn fire(&mut self) -> Result<()> {
        match self.after.take() {
            Some(after) => (*after)(),
            None => Ok(()),
        }
    }
}

impl<A> Drop for OnceGuard<A>
where
    A: Fn() -> Result<()>,
{
    fn drop(&mut self) {
        let _ = self.fire();
    }
}
