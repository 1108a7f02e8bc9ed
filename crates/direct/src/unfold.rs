//! First-class producers
//!
//! An [`Unfold`] separates how a stream is seeded (`inject`) from how it
//! advances (`step`). Keeping the two apart lets producers compose on the
//! element side with [`Unfold::map`] and on the seed side with
//! [`Unfold::lmap`], and lets the bracket combinators scope a resource
//! around the whole lifetime of one injected state.

use std::marker::PhantomData;

use braid_common::Result;

use crate::stream::{Direct, Step};

/// Outcome of advancing an unfold: the explicit-state counterpart of
/// [`Step`].
pub enum UnfoldStep<S, T> {
    /// An element plus the successor state.
    Yield(T, S),
    /// The state advanced without producing an element.
    Skip(S),
    /// The producer is exhausted.
    Stop,
}

/// A producer value: `inject` turns a seed into a running state, `step`
/// advances it.
///
/// One `Unfold` may be injected any number of times; states are
/// independent.
pub trait Unfold: Send + Sized {
    /// Seed consumed by `inject`.
    type Seed;
    /// Running state threaded through `step`.
    type State: Send;
    /// Element type produced.
    type Item: Send;

    /// Start a new run from `seed`.
    fn inject(&mut self, seed: Self::Seed) -> Result<Self::State>;

    /// Advance a run by one step.
    fn step(&mut self, state: Self::State) -> Result<UnfoldStep<Self::State, Self::Item>>;

    /// Transform produced elements with `f`.
    fn map<U, F>(self, f: F) -> MapUnfold<Self, F>
    where
        U: Send,
        F: FnMut(Self::Item) -> U + Send,
    {
        MapUnfold { inner: self, f }
    }

    /// Adapt the seed with `f` before injection.
    fn lmap<A, F>(self, f: F) -> LmapUnfold<A, Self, F>
    where
        F: FnMut(A) -> Self::Seed + Send,
    {
        LmapUnfold {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }
}

/// Unfold backed by a pair of closures.
pub struct FnUnfold<A, I, F> {
    inject: I,
    step: F,
    _marker: PhantomData<fn(A)>,
}

impl<A, I, F> FnUnfold<A, I, F> {
    pub fn new(inject: I, step: F) -> Self {
        FnUnfold {
            inject,
            step,
            _marker: PhantomData,
        }
    }
}

impl<A, S, T, I, F> Unfold for FnUnfold<A, I, F>
where
    S: Send,
    T: Send,
    I: FnMut(A) -> Result<S> + Send,
    F: FnMut(S) -> Result<UnfoldStep<S, T>> + Send,
{
    type Seed = A;
    type State = S;
    type Item = T;

    fn inject(&mut self, seed: A) -> Result<S> {
        (self.inject)(seed)
    }

    fn step(&mut self, state: S) -> Result<UnfoldStep<S, T>> {
        (self.step)(state)
    }
}

/// Unfold returned by [`Unfold::map`].
pub struct MapUnfold<U, F> {
    inner: U,
    f: F,
}

impl<U, F, T> Unfold for MapUnfold<U, F>
where
    U: Unfold,
    T: Send,
    F: FnMut(U::Item) -> T + Send,
{
    type Seed = U::Seed;
    type State = U::State;
    type Item = T;

    fn inject(&mut self, seed: U::Seed) -> Result<U::State> {
        self.inner.inject(seed)
    }

    fn step(&mut self, state: U::State) -> Result<UnfoldStep<U::State, T>> {
        Ok(match self.inner.step(state)? {
            UnfoldStep::Yield(x, s) => UnfoldStep::Yield((self.f)(x), s),
            UnfoldStep::Skip(s) => UnfoldStep::Skip(s),
            UnfoldStep::Stop => UnfoldStep::Stop,
        })
    }
}

/// Unfold returned by [`Unfold::lmap`].
pub struct LmapUnfold<A, U, F> {
    inner: U,
    f: F,
    _marker: PhantomData<fn(A)>,
}

impl<A, U, F> Unfold for LmapUnfold<A, U, F>
where
    U: Unfold,
    F: FnMut(A) -> U::Seed + Send,
{
    type Seed = A;
    type State = U::State;
    type Item = U::Item;

    fn inject(&mut self, seed: A) -> Result<U::State> {
        let seed = (self.f)(seed);
        self.inner.inject(seed)
    }

    fn step(&mut self, state: U::State) -> Result<UnfoldStep<U::State, U::Item>> {
        self.inner.step(state)
    }
}

/// Drive an unfold as a direct stream.
///
/// Injection is deferred to the first step, so resource acquisition in a
/// bracketed unfold happens only once the stream is actually pulled.
pub fn unfold<U>(u: U, seed: U::Seed) -> UnfoldStream<U>
where
    U: Unfold,
{
    UnfoldStream {
        unfold: u,
        state: DriverState::Pending(seed),
    }
}

pub struct UnfoldStream<U: Unfold> {
    unfold: U,
    state: DriverState<U::Seed, U::State>,
}

enum DriverState<A, S> {
    Pending(A),
    Running(S),
    Done,
}

impl<U> Direct for UnfoldStream<U>
where
    U: Unfold,
    U::Seed: Send,
{
    type Item = U::Item;

    async fn step(&mut self) -> Result<Step<U::Item>> {
        match std::mem::replace(&mut self.state, DriverState::Done) {
            DriverState::Pending(seed) => {
                let state = self.unfold.inject(seed)?;
                self.state = DriverState::Running(state);
                Ok(Step::Skip)
            }
            DriverState::Running(state) => match self.unfold.step(state)? {
                UnfoldStep::Yield(x, s) => {
                    self.state = DriverState::Running(s);
                    Ok(Step::Yield(x))
                }
                UnfoldStep::Skip(s) => {
                    self.state = DriverState::Running(s);
                    Ok(Step::Skip)
                }
                UnfoldStep::Stop => Ok(Step::Stop),
            },
            DriverState::Done => Ok(Step::Stop),
        }
    }
}
