//! The four merge operators
//!
//! All four take two streams and give back one, so merge expressions
//! compose the same way regardless of discipline. `serial` and
//! `interleave` walk the continuation form directly; the two parallel
//! operators fork an [`SVar`] and read it back.
//!
//! The parallel operators check the context they are stepped under: a
//! merge node inside a branch that is already running on an SVar of the
//! same style pushes its sibling onto that scheduler instead of nesting a
//! new one, so a whole tree of merges shares one buffer and one worker
//! pool.

use braid_common::SVarConfig;

use crate::stream::Stream;
use crate::svar::{SVar, Sched, Style};

/// All of `a`, then all of `b`. Deterministic; never builds an SVar.
pub fn serial<T: Send + 'static>(a: Stream<T>, b: Stream<T>) -> Stream<T> {
    a.append(b)
}

/// Alternate elements of `a` and `b`; the longer side's tail follows.
pub fn interleave<T: Send + 'static>(a: Stream<T>, b: Stream<T>) -> Stream<T> {
    a.interleave(b)
}

/// Demand-driven parallel merge, biased to the left.
///
/// The left branch is dispatched at once; the right waits in the work
/// queue until the consumer drains buffered output, so a slow consumer
/// keeps a single producer busy while a fast one pulls both branches into
/// flight.
pub fn coparallel<T: Send + 'static>(a: Stream<T>, b: Stream<T>) -> Stream<T> {
    coparallel_with(a, b, SVarConfig::default())
}

/// [`coparallel`] with explicit buffering and worker-limit parameters.
pub fn coparallel_with<T: Send + 'static>(
    a: Stream<T>,
    b: Stream<T>,
    config: SVarConfig,
) -> Stream<T> {
    Stream::from_step(move |ctx| async move {
        match ctx {
            Some(sv) if sv.style() == Style::PARALLEL_LIFO => {
                // Already running under a demand-driven scheduler: queue
                // the right branch there and keep evaluating the left in
                // place.
                sv.push(b);
                a.advance(Some(sv)).await
            }
            _ => fork(a, b, Style::PARALLEL_LIFO, config).advance(None).await,
        }
    })
}

/// Fair parallel merge: both branches run concurrently from the start and
/// the buffer is serviced round-robin.
pub fn parallel<T: Send + 'static>(a: Stream<T>, b: Stream<T>) -> Stream<T> {
    parallel_with(a, b, SVarConfig::default())
}

/// [`parallel`] with explicit buffering and worker-limit parameters.
pub fn parallel_with<T: Send + 'static>(
    a: Stream<T>,
    b: Stream<T>,
    config: SVarConfig,
) -> Stream<T> {
    Stream::from_step(move |ctx| async move {
        match ctx {
            Some(sv) if sv.style() == Style::PARALLEL_FIFO => {
                // Fair push: the sibling gets its worker immediately.
                sv.push(a);
                b.advance(Some(sv)).await
            }
            _ => fork(a, b, Style::PARALLEL_FIFO, config).advance(None).await,
        }
    })
}

/// Build an SVar for a two-branch merge and hand back its consumer side.
fn fork<T: Send + 'static>(
    a: Stream<T>,
    b: Stream<T>,
    style: Style,
    config: SVarConfig,
) -> Stream<T> {
    let sv = SVar::new(style, config);
    match style.sched {
        Sched::Lifo => {
            // Enqueue right first so the left lands at the head of the
            // stack, then dispatch it: the left branch runs immediately,
            // the right on the first drain.
            sv.push(b);
            sv.push(a);
            sv.dispatch_one();
        }
        Sched::Fifo => {
            // Fair: push dispatches eagerly under FIFO.
            sv.push(a);
            sv.push(b);
        }
    }
    Stream::from_svar(sv)
}

/// Zip with both sides evaluated concurrently with the zip itself.
pub fn zip_with_parallel<T, U, V, F>(a: Stream<T>, b: Stream<U>, f: F) -> Stream<V>
where
    T: Send + 'static,
    U: Send + 'static,
    V: Send + 'static,
    F: Fn(T, U) -> V + Send + Sync + 'static,
{
    let a = a.prefetch(SVarConfig::default());
    let b = b.prefetch(SVarConfig::default());
    a.zip_with(b, f)
}

impl<T: Send + 'static> Stream<T> {
    /// Evaluate this stream concurrently with its consumer through a
    /// single-producer demand-driven buffer of `config.bound` elements.
    pub fn prefetch(self, config: SVarConfig) -> Stream<T> {
        Stream::from_step(move |_| async move {
            let sv = SVar::new(Style::PARALLEL_LIFO, config);
            sv.push(self);
            sv.dispatch_one();
            Stream::from_svar(sv).advance(None).await
        })
    }
}
