//! The continuation-form stream
//!
//! A [`Stream`] wraps a single-shot step function. Stepping consumes the
//! stream and reports one of three shapes: `Stop`, a final `Single`
//! element, or `Yield` with a tail. The optional step argument is the
//! stream variable the step runs under; parallel merge operators use it to
//! feed sibling branches into an enclosing scheduler instead of nesting a
//! new one (see `merge`). Serial operators pass no context.
//!
//! Errors from user code travel as the `Err` side of the step result and
//! short-circuit the stream.

use std::future::Future;
use std::sync::Arc;

use braid_common::{Result, StreamError};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::svar::SVar;

type StepFn<T> = Box<dyn FnOnce(Option<Arc<SVar<T>>>) -> BoxFuture<'static, Result<Next<T>>> + Send>;

/// A lazy stream of values of type `T`.
pub struct Stream<T> {
    step: StepFn<T>,
}

/// Outcome of advancing a stream by one step.
pub enum Next<T> {
    /// The stream is empty.
    Stop,
    /// One final element; no tail follows.
    Single(T),
    /// One element plus the rest of the stream.
    Yield(T, Stream<T>),
}

impl<T: Send + 'static> Stream<T> {
    /// Build a stream from a step function.
    pub(crate) fn from_step<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Option<Arc<SVar<T>>>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Next<T>>> + Send + 'static,
    {
        Stream {
            step: Box::new(move |ctx| f(ctx).boxed()),
        }
    }

    /// Advance the stream one step under an optional scheduler context.
    pub(crate) async fn advance(self, ctx: Option<Arc<SVar<T>>>) -> Result<Next<T>> {
        (self.step)(ctx).await
    }

    /// The empty stream.
    pub fn nil() -> Self {
        Stream::from_step(|_| async { Ok(Next::Stop) })
    }

    /// The one-element stream.
    pub fn once(x: T) -> Self {
        Stream::from_step(move |_| async move { Ok(Next::Single(x)) })
    }

    /// Prepend an element.
    pub fn cons(x: T, tail: Stream<T>) -> Self {
        Stream::from_step(move |_| async move { Ok(Next::Yield(x, tail)) })
    }

    /// Stream over any iterator.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let mut it = iter.into_iter();
        Stream::from_step(move |_| async move {
            Ok(match it.next() {
                Some(x) => Next::Yield(x, Stream::from_iter(it)),
                None => Next::Stop,
            })
        })
    }

    /// The stream that fails immediately.
    pub fn raise(err: StreamError) -> Self {
        Stream::from_step(move |_| async move { Err(err) })
    }

    /// Endless stream of `f()` calls.
    pub fn repeat_with<F>(mut f: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Stream::from_step(move |_| async move {
            let x = f();
            Ok(Next::Yield(x, Stream::repeat_with(f)))
        })
    }

    /// `n` calls of `f()`.
    pub fn replicate_with<F>(n: usize, mut f: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Stream::from_step(move |_| async move {
            if n == 0 {
                return Ok(Next::Stop);
            }
            let x = f();
            Ok(Next::Yield(x, Stream::replicate_with(n - 1, f)))
        })
    }

    /// `seed, f(&seed), f(&f(&seed)), ...`
    pub fn iterate<F>(seed: T, mut f: F) -> Self
    where
        F: FnMut(&T) -> T + Send + 'static,
    {
        Stream::from_step(move |_| async move {
            let next = f(&seed);
            Ok(Next::Yield(seed, Stream::iterate(next, f)))
        })
    }

    /// Anamorphism: unfold a stream from a seed. `Ok(None)` ends it.
    pub fn unfold_step<S, F>(seed: S, mut f: F) -> Self
    where
        S: Send + 'static,
        F: FnMut(S) -> Result<Option<(T, S)>> + Send + 'static,
    {
        Stream::from_step(move |_| async move {
            Ok(match f(seed)? {
                Some((x, next)) => Next::Yield(x, Stream::unfold_step(next, f)),
                None => Next::Stop,
            })
        })
    }

    /// Serial concatenation: all of `self`, then all of `other`.
    pub fn append(self, other: Stream<T>) -> Stream<T> {
        Stream::from_step(move |_| async move {
            Ok(match self.advance(None).await? {
                Next::Stop => return other.advance(None).await,
                Next::Single(x) => Next::Yield(x, other),
                Next::Yield(x, rest) => Next::Yield(x, rest.append(other)),
            })
        })
    }

    /// Round-robin between `self` and `other`, one element each, until
    /// both are exhausted. The operands swap on every yield; only
    /// finitely many streams may be interleaved this way.
    pub fn interleave(self, other: Stream<T>) -> Stream<T> {
        Stream::from_step(move |_| async move {
            Ok(match self.advance(None).await? {
                Next::Stop => return other.advance(None).await,
                Next::Single(x) => Next::Yield(x, other),
                Next::Yield(x, rest) => Next::Yield(x, other.interleave(rest)),
            })
        })
    }

    /// Transform every element with `f`.
    pub fn map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<U, F>(self, f: Arc<F>) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Stream::from_step(move |_| async move {
            Ok(match self.advance(None).await? {
                Next::Stop => Next::Stop,
                Next::Single(x) => Next::Single((*f)(x)),
                Next::Yield(x, rest) => {
                    let y = (*f)(x);
                    Next::Yield(y, rest.map_shared(f))
                }
            })
        })
    }

    /// Transform every element with an effectful `f`.
    pub fn map_async<U, F, Fut>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        self.map_async_shared(Arc::new(f))
    }

    fn map_async_shared<U, F, Fut>(self, f: Arc<F>) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        Stream::from_step(move |_| async move {
            Ok(match self.advance(None).await? {
                Next::Stop => Next::Stop,
                Next::Single(x) => Next::Single((*f)(x).await?),
                Next::Yield(x, rest) => {
                    let y = (*f)(x).await?;
                    Next::Yield(y, rest.map_async_shared(f))
                }
            })
        })
    }

    /// Keep only elements satisfying `pred`.
    pub fn filter<F>(self, pred: F) -> Stream<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter_shared(Arc::new(pred))
    }

    fn filter_shared<F>(self, pred: Arc<F>) -> Stream<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Stream::from_step(move |_| async move {
            let mut cur = self;
            loop {
                match cur.advance(None).await? {
                    Next::Stop => return Ok(Next::Stop),
                    Next::Single(x) => {
                        return Ok(if (*pred)(&x) { Next::Single(x) } else { Next::Stop });
                    }
                    Next::Yield(x, rest) => {
                        if (*pred)(&x) {
                            return Ok(Next::Yield(x, rest.filter_shared(pred)));
                        }
                        cur = rest;
                    }
                }
            }
        })
    }

    /// Pass through at most `n` elements.
    pub fn take(self, n: usize) -> Stream<T> {
        Stream::from_step(move |_| async move {
            if n == 0 {
                return Ok(Next::Stop);
            }
            Ok(match self.advance(None).await? {
                Next::Stop => Next::Stop,
                Next::Single(x) => Next::Single(x),
                Next::Yield(x, rest) => Next::Yield(x, rest.take(n - 1)),
            })
        })
    }

    /// Nested-loop bind under a caller-chosen join: for each element `x`,
    /// substitute `k(x)`, merging the inner stream with the rest of the
    /// expansion via `join`.
    ///
    /// The join decides the discipline: [`crate::merge::serial`] gives
    /// depth-first expansion, [`crate::merge::interleave`] the fair
    /// diagonal, [`crate::merge::coparallel`] and [`crate::merge::parallel`]
    /// fork the inner loops concurrently.
    pub fn concat_map_with<U, J, K>(self, join: J, k: K) -> Stream<U>
    where
        U: Send + 'static,
        J: Fn(Stream<U>, Stream<U>) -> Stream<U> + Send + Sync + 'static,
        K: Fn(T) -> Stream<U> + Send + Sync + 'static,
    {
        self.concat_map_shared(Arc::new(join), Arc::new(k))
    }

    fn concat_map_shared<U, J, K>(self, join: Arc<J>, k: Arc<K>) -> Stream<U>
    where
        U: Send + 'static,
        J: Fn(Stream<U>, Stream<U>) -> Stream<U> + Send + Sync + 'static,
        K: Fn(T) -> Stream<U> + Send + Sync + 'static,
    {
        Stream::from_step(move |ctx| async move {
            match self.advance(None).await? {
                Next::Stop => Ok(Next::Stop),
                Next::Single(x) => (*k)(x).advance(ctx).await,
                Next::Yield(x, rest) => {
                    let inner = (*k)(x);
                    let tail = rest.concat_map_shared(join.clone(), k.clone());
                    (*join)(inner, tail).advance(ctx).await
                }
            }
        })
    }

    /// Depth-first bind: fully exhaust each inner stream before advancing
    /// the outer one.
    pub fn concat_map<U, K>(self, k: K) -> Stream<U>
    where
        U: Send + 'static,
        K: Fn(T) -> Stream<U> + Send + Sync + 'static,
    {
        self.concat_map_with(|a: Stream<U>, b: Stream<U>| a.append(b), k)
    }

    /// Combine element-wise with `other`; stops with the shorter side.
    pub fn zip_with<U, V, F>(self, other: Stream<U>, f: F) -> Stream<V>
    where
        U: Send + 'static,
        V: Send + 'static,
        F: Fn(T, U) -> V + Send + Sync + 'static,
    {
        self.zip_shared(other, Arc::new(f))
    }

    fn zip_shared<U, V, F>(self, other: Stream<U>, f: Arc<F>) -> Stream<V>
    where
        U: Send + 'static,
        V: Send + 'static,
        F: Fn(T, U) -> V + Send + Sync + 'static,
    {
        Stream::from_step(move |_| async move {
            let (x, xs) = match self.advance(None).await? {
                Next::Stop => return Ok(Next::Stop),
                Next::Single(x) => (x, None),
                Next::Yield(x, rest) => (x, Some(rest)),
            };
            let (y, ys) = match other.advance(None).await? {
                Next::Stop => return Ok(Next::Stop),
                Next::Single(y) => (y, None),
                Next::Yield(y, rest) => (y, Some(rest)),
            };
            Ok(match (xs, ys) {
                (Some(xs), Some(ys)) => Next::Yield((*f)(x, y), xs.zip_shared(ys, f)),
                _ => Next::Single((*f)(x, y)),
            })
        })
    }

    /// Convert an error anywhere in the stream into a replacement stream.
    pub fn on_error<F>(self, handler: F) -> Stream<T>
    where
        F: Fn(StreamError) -> Stream<T> + Send + Sync + 'static,
    {
        self.on_error_shared(Arc::new(handler))
    }

    fn on_error_shared<F>(self, handler: Arc<F>) -> Stream<T>
    where
        F: Fn(StreamError) -> Stream<T> + Send + Sync + 'static,
    {
        Stream::from_step(move |ctx| async move {
            match self.advance(ctx).await {
                Ok(Next::Stop) => Ok(Next::Stop),
                Ok(Next::Single(x)) => Ok(Next::Single(x)),
                Ok(Next::Yield(x, rest)) => Ok(Next::Yield(x, rest.on_error_shared(handler))),
                Err(e) => (*handler)(e).advance(None).await,
            }
        })
    }

    /// Step the stream under `sv` so that compatible merge nodes inside it
    /// feed the existing scheduler instead of creating their own.
    pub fn with_context(self, sv: Arc<SVar<T>>) -> Stream<T> {
        Stream::from_step(move |_| async move {
            Ok(match self.advance(Some(sv.clone())).await? {
                Next::Stop => Next::Stop,
                Next::Single(x) => Next::Single(x),
                Next::Yield(x, rest) => Next::Yield(x, rest.with_context(sv)),
            })
        })
    }

    /// Consumer-side view of a stream variable: elements appear as its
    /// workers deliver them, and the stream ends when the scheduler drains.
    pub fn from_svar(sv: Arc<SVar<T>>) -> Stream<T> {
        Stream::from_step(move |_| async move {
            Ok(match sv.pull().await? {
                Some(x) => Next::Yield(x, Stream::from_svar(sv)),
                None => Next::Stop,
            })
        })
    }

    /// Run the stream to completion, discarding elements.
    pub async fn drain(self) -> Result<()> {
        let mut cur = self;
        loop {
            match cur.advance(None).await? {
                Next::Stop | Next::Single(_) => return Ok(()),
                Next::Yield(_, rest) => cur = rest,
            }
        }
    }

    /// Strict left fold.
    pub async fn fold<B, F>(self, init: B, mut f: F) -> Result<B>
    where
        B: Send,
        F: FnMut(B, T) -> B + Send,
    {
        let mut acc = init;
        let mut cur = self;
        loop {
            match cur.advance(None).await? {
                Next::Stop => return Ok(acc),
                Next::Single(x) => return Ok(f(acc, x)),
                Next::Yield(x, rest) => {
                    acc = f(acc, x);
                    cur = rest;
                }
            }
        }
    }

    /// Strict left fold with an effectful step.
    pub async fn fold_async<B, F, Fut>(self, init: B, mut f: F) -> Result<B>
    where
        B: Send,
        F: FnMut(B, T) -> Fut + Send,
        Fut: Future<Output = Result<B>> + Send,
    {
        let mut acc = init;
        let mut cur = self;
        loop {
            match cur.advance(None).await? {
                Next::Stop => return Ok(acc),
                Next::Single(x) => return f(acc, x).await,
                Next::Yield(x, rest) => {
                    acc = f(acc, x).await?;
                    cur = rest;
                }
            }
        }
    }

    /// Collect all elements in order.
    pub async fn to_vec(self) -> Result<Vec<T>> {
        self.fold(Vec::new(), |mut acc, x| {
            acc.push(x);
            acc
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_constructors() {
        assert_eq!(Stream::<u64>::nil().to_vec().await.unwrap(), Vec::<u64>::new());
        assert_eq!(Stream::once(7).to_vec().await.unwrap(), vec![7]);
        assert_eq!(
            Stream::cons(1, Stream::from_iter(vec![2, 3]))
                .to_vec()
                .await
                .unwrap(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_generators() {
        assert_eq!(
            Stream::iterate(1u64, |x| x * 2).take(5).to_vec().await.unwrap(),
            vec![1, 2, 4, 8, 16]
        );
        let mut n = 0;
        assert_eq!(
            Stream::replicate_with(3, move || {
                n += 1;
                n
            })
            .to_vec()
            .await
            .unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(
            Stream::unfold_step(3u64, |n| Ok((n > 0).then(|| (n * 10, n - 1))))
                .to_vec()
                .await
                .unwrap(),
            vec![30, 20, 10]
        );
        assert_eq!(
            Stream::repeat_with(|| 9u8).take(3).to_vec().await.unwrap(),
            vec![9, 9, 9]
        );
    }

    #[tokio::test]
    async fn test_map_filter_take() {
        let out = Stream::from_iter(1..=20u64)
            .map(|x| x * 3)
            .filter(|x| x % 2 == 0)
            .take(4)
            .to_vec()
            .await
            .unwrap();
        assert_eq!(out, vec![6, 12, 18, 24]);
    }

    #[tokio::test]
    async fn test_map_async_orders_effects() {
        let out = Stream::from_iter(1..=3u64)
            .map_async(|x| async move { Ok(x + 100) })
            .to_vec()
            .await
            .unwrap();
        assert_eq!(out, vec![101, 102, 103]);
    }

    #[tokio::test]
    async fn test_append_handles_single_tails() {
        let out = Stream::once(1)
            .append(Stream::once(2))
            .append(Stream::from_iter(vec![3, 4]))
            .to_vec()
            .await
            .unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_folds() {
        let sum = Stream::from_iter(1..=10u64)
            .fold(0u64, |acc, x| acc + x)
            .await
            .unwrap();
        assert_eq!(sum, 55);

        let sum = Stream::from_iter(1..=4u64)
            .fold_async(0u64, |acc, x| async move { Ok(acc + x) })
            .await
            .unwrap();
        assert_eq!(sum, 10);

        Stream::from_iter(0..100u64).drain().await.unwrap();
    }
}
