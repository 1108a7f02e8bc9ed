//! Bridges between the stream forms, and tokio ecosystem interop
//!
//! The two directions compose to the identity on observable output:
//! lowering a continuation stream to the direct form and lifting it back
//! (or the other way around) preserves every element in order.

use braid_common::Result;
use braid_direct::{Direct, Step, Unfold};

use crate::stream::{Next, Stream};

/// Lift a direct stream into the continuation form.
pub fn from_direct<D>(d: D) -> Stream<D::Item>
where
    D: Direct + 'static,
    D::Item: 'static,
{
    Stream::from_step(move |_| async move {
        let mut d = d;
        loop {
            match d.step().await? {
                Step::Yield(x) => return Ok(Next::Yield(x, from_direct(d))),
                Step::Skip => continue,
                Step::Stop => return Ok(Next::Stop),
            }
        }
    })
}

/// Drive an unfold as a continuation stream.
pub fn from_unfold<U>(u: U, seed: U::Seed) -> Stream<U::Item>
where
    U: Unfold + 'static,
    U::Seed: Send + 'static,
    U::State: 'static,
    U::Item: 'static,
{
    from_direct(braid_direct::unfold(u, seed))
}

/// Lower a continuation stream into the direct form.
pub fn to_direct<T: Send + 'static>(s: Stream<T>) -> FromStream<T> {
    FromStream { next: Some(s) }
}

/// Direct stream returned by [`to_direct`].
pub struct FromStream<T> {
    next: Option<Stream<T>>,
}

impl<T: Send + 'static> Direct for FromStream<T> {
    type Item = T;

    async fn step(&mut self) -> Result<Step<T>> {
        let Some(s) = self.next.take() else {
            return Ok(Step::Stop);
        };
        match s.advance(None).await? {
            Next::Stop => Ok(Step::Stop),
            Next::Single(x) => Ok(Step::Yield(x)),
            Next::Yield(x, rest) => {
                self.next = Some(rest);
                Ok(Step::Yield(x))
            }
        }
    }
}

impl<T: Send + 'static> Stream<T> {
    /// Adapt into a `tokio_stream::Stream` of results.
    ///
    /// The first error ends the adapted stream after it is yielded.
    pub fn into_stream(self) -> impl tokio_stream::Stream<Item = Result<T>> + Send {
        async_stream::stream! {
            let mut cur = self;
            loop {
                match cur.advance(None).await {
                    Ok(Next::Stop) => break,
                    Ok(Next::Single(x)) => {
                        yield Ok(x);
                        break;
                    }
                    Ok(Next::Yield(x, rest)) => {
                        yield Ok(x);
                        cur = rest;
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}
