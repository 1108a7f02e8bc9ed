//! Shared helpers for braid-stream integration tests
#![allow(dead_code)]

use std::time::Duration;

use braid_stream::{Stream, StreamError};
use tokio_stream::StreamExt;

/// Route scheduler traces to stderr when `RUST_LOG` asks for them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Stream over `items` that sleeps `delay` before delivering each element.
pub fn slow_from_iter(items: Vec<i64>, delay: Duration) -> Stream<i64> {
    Stream::from_iter(items).map_async(move |x| async move {
        tokio::time::sleep(delay).await;
        Ok(x)
    })
}

/// Collect values until the stream ends or fails, returning both.
pub async fn collect_until_error<T: Send + 'static>(
    s: Stream<T>,
) -> (Vec<T>, Option<StreamError>) {
    let s = s.into_stream();
    tokio::pin!(s);
    let mut values = Vec::new();
    while let Some(item) = s.next().await {
        match item {
            Ok(x) => values.push(x),
            Err(e) => return (values, Some(e)),
        }
    }
    (values, None)
}

/// Per-branch element counts stay within `slack` of each other at every
/// prefix, where branch identity is `element / 100`.
pub fn assert_prefix_balance(output: &[i64], branches: usize, slack: usize) {
    let mut counts = vec![0usize; branches];
    for (i, x) in output.iter().enumerate() {
        let branch = (*x as usize) / 100;
        counts[branch] += 1;
        let max = counts.iter().max().unwrap();
        let min = counts.iter().min().unwrap();
        // Branches that are already exhausted stop counting against the
        // balance; only compare while every branch still has elements due.
        let shortest_done = counts.iter().any(|c| *c * branches >= output.len());
        if !shortest_done {
            assert!(
                max - min <= slack,
                "unbalanced prefix at {}: counts {:?} for output {:?}",
                i,
                counts,
                output
            );
        }
    }
}
