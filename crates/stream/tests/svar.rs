//! Scheduler behavior: backpressure, dispatch policy, limits, lifecycle

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use braid_stream::{coparallel_with, Phase, SVar, SVarConfig, Stream, Style};
use common::{init_tracing, slow_from_iter};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_backpressure_bound_is_never_exceeded() {
    init_tracing();
    // Three producers of three elements each through a buffer of two.
    let sv = SVar::new(Style::PARALLEL_FIFO, SVarConfig::bounded(2));
    sv.push(Stream::from_iter(vec![0i64, 1, 2]));
    sv.push(Stream::from_iter(vec![100, 101, 102]));
    sv.push(Stream::from_iter(vec![200, 201, 202]));

    let probe = sv.clone();
    let max_seen = Arc::new(AtomicUsize::new(0));
    let max_probe = max_seen.clone();

    let out = Stream::from_svar(sv.clone())
        .fold_async(Vec::new(), move |mut acc, x| {
            let probe = probe.clone();
            let max_probe = max_probe.clone();
            async move {
                max_probe.fetch_max(probe.queued(), Ordering::SeqCst);
                // A slow consumer forces every producer into the parked
                // state at least once.
                tokio::time::sleep(Duration::from_millis(2)).await;
                acc.push(x);
                Ok(acc)
            }
        })
        .await
        .unwrap();

    assert_eq!(out.len(), 9);
    assert!(
        max_seen.load(Ordering::SeqCst) <= 2,
        "observed queue depth beyond the bound"
    );
    assert_eq!(sv.active_workers(), 0);
    assert_eq!(sv.pending_work(), 0);
    assert_eq!(sv.phase(), Phase::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_leaked_workers_after_completion() {
    let sv = SVar::new(Style::PARALLEL_FIFO, SVarConfig::default());
    for base in [0i64, 100, 200, 300] {
        sv.push(Stream::from_iter((base..base + 10).collect::<Vec<_>>()));
    }
    let out = Stream::from_svar(sv.clone()).to_vec().await.unwrap();
    assert_eq!(out.len(), 40);
    assert_eq!(sv.active_workers(), 0);
    assert_eq!(sv.pending_work(), 0);
    assert_eq!(sv.phase(), Phase::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_limit_caps_concurrency() {
    let sv = SVar::new(
        Style::PARALLEL_FIFO,
        SVarConfig::bounded(8).with_limit(1),
    );
    sv.push(slow_from_iter(vec![0, 1, 2], Duration::from_millis(5)));
    sv.push(slow_from_iter(vec![100, 101], Duration::from_millis(5)));
    sv.push(slow_from_iter(vec![200], Duration::from_millis(5)));

    let probe = sv.clone();
    let max_active = Arc::new(AtomicUsize::new(0));
    let max_probe = max_active.clone();
    let out = Stream::from_svar(sv.clone())
        .fold_async(Vec::new(), move |mut acc, x| {
            let probe = probe.clone();
            let max_probe = max_probe.clone();
            async move {
                max_probe.fetch_max(probe.active_workers(), Ordering::SeqCst);
                acc.push(x);
                Ok(acc)
            }
        })
        .await
        .unwrap();

    assert_eq!(out.len(), 6);
    assert!(max_active.load(Ordering::SeqCst) <= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_limit_with_backpressure_makes_progress() {
    // A parked branch holds the only worker slot while a fresh branch
    // sits ahead of it in the queue; dispatch must resume the parked
    // branch or nothing will ever ring the doorbell again.
    let sv = SVar::new(
        Style::PARALLEL_FIFO,
        SVarConfig::bounded(2).with_limit(1),
    );
    sv.push(Stream::from_iter((0..5).collect::<Vec<i64>>()));
    sv.push(Stream::from_iter((100..105).collect::<Vec<i64>>()));

    let out = Stream::from_svar(sv.clone())
        .fold_async(Vec::new(), |mut acc, x| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            acc.push(x);
            Ok(acc)
        })
        .await
        .unwrap();
    assert_eq!(out.len(), 10);
    assert_eq!(sv.phase(), Phase::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serial_tag_runs_one_branch_to_completion() {
    // A serial-tagged SVar caps dispatch at one worker, so branches come
    // out strictly concatenated even though both are queued up front.
    let sv = SVar::new(Style::SERIAL_LIFO, SVarConfig::bounded(2));
    sv.push(Stream::from_iter(vec![100i64, 101, 102]));
    sv.push(Stream::from_iter(vec![0, 1, 2, 3]));

    let out = Stream::from_svar(sv.clone()).to_vec().await.unwrap();
    // LIFO: the branch pushed last runs first, parks at the bound, and
    // resumes ahead of the other branch until it finishes.
    assert_eq!(out, vec![0, 1, 2, 3, 100, 101, 102]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_demand_driven_stays_single_under_slow_consumer() {
    // Instant producers, slow consumer: the left branch parks on the full
    // buffer and is always the one resumed; the right never needs a
    // second concurrent worker.
    let sv = SVar::new(Style::PARALLEL_LIFO, SVarConfig::bounded(4));
    sv.push(Stream::from_iter((100..110).collect::<Vec<i64>>()));
    sv.push(Stream::from_iter((0..10).collect::<Vec<i64>>()));

    let probe = sv.clone();
    let max_active = Arc::new(AtomicUsize::new(0));
    let max_probe = max_active.clone();
    let out = Stream::from_svar(sv.clone())
        .fold_async(Vec::new(), move |mut acc, x| {
            let probe = probe.clone();
            let max_probe = max_probe.clone();
            async move {
                max_probe.fetch_max(probe.active_workers(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(3)).await;
                acc.push(x);
                Ok(acc)
            }
        })
        .await
        .unwrap();

    assert_eq!(out.len(), 20);
    // The branch dispatched first is drained completely before the other
    // branch ever runs.
    assert_eq!(&out[..10], &(0..10).collect::<Vec<i64>>()[..]);
    assert!(max_active.load(Ordering::SeqCst) <= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_demand_driven_elasticity_under_fast_consumer() {
    // One branch sleeps per element, the other yields instantly, the
    // consumer is instant: both workers end up in flight and total wall
    // time tracks the slow branch alone.
    let slow = slow_from_iter(vec![0, 1, 2], Duration::from_millis(50));
    let fast = Stream::from_iter(vec![100i64, 101, 102]);

    let started = Instant::now();
    let mut out = coparallel_with(slow, fast, SVarConfig::bounded(4))
        .to_vec()
        .await
        .unwrap();
    let elapsed = started.elapsed();

    out.sort_unstable();
    assert_eq!(out, vec![0, 1, 2, 100, 101, 102]);
    // Serial evaluation would cost ~300ms of sleeps; concurrent costs
    // ~150ms. Generous slack for scheduler noise.
    assert!(
        elapsed < Duration::from_millis(260),
        "branches did not run concurrently: {:?}",
        elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prefetch_decouples_producer_from_consumer() {
    let out = Stream::from_iter((0..20).collect::<Vec<i64>>())
        .prefetch(SVarConfig::bounded(3))
        .map_async(|x| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(x)
        })
        .to_vec()
        .await
        .unwrap();
    // A single producer through a buffer preserves yield order.
    assert_eq!(out, (0..20).collect::<Vec<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_branches_terminate_cleanly() {
    let sv = SVar::new(Style::PARALLEL_FIFO, SVarConfig::default());
    sv.push(Stream::nil());
    sv.push(Stream::from_iter(vec![1i64]));
    sv.push(Stream::nil());

    let out = Stream::from_svar(sv.clone()).to_vec().await.unwrap();
    assert_eq!(out, vec![1]);
    assert_eq!(sv.active_workers(), 0);
    assert_eq!(sv.phase(), Phase::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_push_after_close_is_dropped() {
    let sv = SVar::new(Style::PARALLEL_FIFO, SVarConfig::default());
    sv.push(Stream::from_iter(vec![1i64, 2]));
    let out = Stream::from_svar(sv.clone()).to_vec().await.unwrap();
    assert_eq!(out, vec![1, 2]);
    assert_eq!(sv.phase(), Phase::Closed);

    // The scheduler has terminated; late pushes go nowhere.
    sv.push(Stream::from_iter(vec![3i64]));
    assert_eq!(sv.pending_work(), 0);
}
