//! Error delivery, abort, and resource release

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use braid_direct::{enumerate_from_step, finally, unfold, Direct, FnUnfold, UnfoldStep};
use braid_stream::{
    from_direct, parallel, parallel_with, serial, Stream, StreamError, SVarConfig,
};
use common::collect_until_error;
use tokio_stream::StreamExt;

/// Ten elements, failing on the fifth.
fn failing_at_five() -> Stream<i64> {
    from_direct(enumerate_from_step(0i64, 1).take(10).then(|x| async move {
        if x == 5 {
            Err(StreamError::user("element five is cursed"))
        } else {
            Ok(x)
        }
    }))
}

/// Endless slow stream whose teardown bumps `released`.
fn guarded_endless(released: Arc<AtomicUsize>) -> Stream<i64> {
    let counter = FnUnfold::new(
        |seed: i64| Ok(seed),
        |n: i64| Ok(UnfoldStep::Yield(n, n + 1)),
    );
    let probe = released.clone();
    let guarded = finally(
        move || {
            probe.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
        counter,
    );
    from_direct(unfold(guarded, 0).then(|x| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(x)
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_error_delivered_after_preceding_values() {
    // Through a buffer of three: the consumer sees an in-order prefix of
    // 0..=4, then the error, and nothing from index five onward.
    let (values, err) =
        collect_until_error(failing_at_five().prefetch(SVarConfig::bounded(3))).await;
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert!(matches!(err, Some(StreamError::User(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_error_cancels_siblings() {
    let released = Arc::new(AtomicUsize::new(0));
    let bad = serial(
        Stream::from_iter(vec![1000i64, 1001]),
        Stream::raise(StreamError::user("boom")),
    );

    let (_values, err) =
        collect_until_error(parallel(bad, guarded_endless(released.clone()))).await;
    assert!(matches!(err, Some(StreamError::User(_))));

    // The endless sibling is cancelled and its release hook runs.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandonment_cancels_workers_and_releases() {
    let released = Arc::new(AtomicUsize::new(0));
    {
        let s = guarded_endless(released.clone())
            .prefetch(SVarConfig::bounded(4))
            .into_stream();
        tokio::pin!(s);
        // Take a couple of elements, then walk away from the rest.
        assert_eq!(s.next().await.unwrap().unwrap(), 0);
        assert_eq!(s.next().await.unwrap().unwrap(), 1);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandonment_releases_every_live_worker() {
    let released = Arc::new(AtomicUsize::new(0));
    {
        // A small buffer so both abandoned workers park, and with them the
        // last strong handles on the scheduler, well inside the deadline.
        let merged = parallel_with(
            guarded_endless(released.clone()),
            guarded_endless(released.clone()),
            SVarConfig::bounded(4),
        );
        let s = merged.into_stream();
        tokio::pin!(s);
        assert!(s.next().await.unwrap().is_ok());
        assert!(s.next().await.unwrap().is_ok());
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(released.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_on_error_substitutes_a_stream() {
    let out = serial(
        Stream::from_iter(vec![1i64, 2]),
        Stream::raise(StreamError::user("gap")),
    )
    .on_error(|_| Stream::from_iter(vec![8, 9]))
    .to_vec()
    .await
    .unwrap();
    assert_eq!(out, vec![1, 2, 8, 9]);
}

#[tokio::test]
async fn test_error_propagates_through_serial_combinators() {
    let err = failing_at_five()
        .map(|x| x * 2)
        .filter(|x| x % 2 == 0)
        .to_vec()
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::User(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_panic_surfaces_as_error() {
    let s = Stream::from_iter(vec![1i64, 2, 3])
        .map(|x| {
            if x == 2 {
                panic!("bad element");
            }
            x
        })
        .prefetch(SVarConfig::bounded(8));

    let (values, err) = collect_until_error(s).await;
    assert_eq!(values, vec![1]);
    match err {
        Some(StreamError::User(msg)) => assert!(msg.contains("bad element")),
        other => panic!("expected user error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_error_from_map_async_aborts_parallel_merge() {
    let bad = Stream::from_iter(vec![1i64, 2, 3]).map_async(|x| async move {
        if x == 2 {
            Err(StreamError::user("mid-stream failure"))
        } else {
            Ok(x)
        }
    });
    let good = Stream::from_iter((100..120).collect::<Vec<i64>>());

    let (_values, err) = collect_until_error(parallel(bad, good)).await;
    assert!(matches!(err, Some(StreamError::User(_))));
}
