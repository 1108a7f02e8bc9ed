//! The stream variable: bounded buffer plus worker scheduler
//!
//! An `SVar` binds any number of producer branches to exactly one
//! consumer. Producers run as spawned worker tasks that deliver into a
//! bounded output queue; the consumer pulls from the queue and blocks on a
//! doorbell when it runs dry. Backpressure never blocks a producer
//! thread: a worker that finds the queue full parks its continuation in
//! the work queue and returns, and the consumer re-dispatches parked work
//! as it drains.
//!
//! Shared state is one mutex per SVar plus an atomic worker counter. The
//! mutex is never held across an await and never around user code; the
//! consumer releases it before waiting on the doorbell.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use braid_common::{next_account_id, Result, StreamError, SVarConfig};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::stream::Stream;

mod worker;

/// Concurrency of producers: one at a time, or all at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// At most one worker produces at any time. The consumer still runs
    /// concurrently with it.
    Serial,
    /// Every dispatched branch runs concurrently, up to the worker limit.
    Parallel,
}

/// Work-queue discipline: which parked branch runs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sched {
    /// Stack order. The most recently parked branch resumes first, which
    /// biases output toward the left operand of a merge.
    Lifo,
    /// Queue order. Branches resume round-robin.
    Fifo,
}

/// A merge discipline: producer concurrency crossed with scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub tag: Tag,
    pub sched: Sched,
}

impl Style {
    pub const SERIAL_LIFO: Style = Style {
        tag: Tag::Serial,
        sched: Sched::Lifo,
    };
    pub const SERIAL_FIFO: Style = Style {
        tag: Tag::Serial,
        sched: Sched::Fifo,
    };
    /// Demand-driven parallel: the discipline behind `coparallel`.
    pub const PARALLEL_LIFO: Style = Style {
        tag: Tag::Parallel,
        sched: Sched::Lifo,
    };
    /// Fair parallel: the discipline behind `parallel`.
    pub const PARALLEL_FIFO: Style = Style {
        tag: Tag::Parallel,
        sched: Sched::Fifo,
    };
}

/// Consumer-observable lifecycle of an SVar.
///
/// Transitions happen on consumer pulls only; producers never read the
/// phase beyond the closed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Branches may still be queued for dispatch.
    Open,
    /// The work queue is empty but workers are still delivering.
    Draining,
    /// Terminated or aborted. Workers are cancelled, queues cleared.
    Closed,
}

/// One entry in the output queue.
enum Event<T> {
    Value(T),
    Error(StreamError),
    ChildStop(u64),
}

/// A producer branch awaiting dispatch.
struct Branch<T> {
    stream: Stream<T>,
    /// Worker id when this is a parked continuation resuming under its
    /// existing count; `None` for a branch that has never run.
    resumed: Option<u64>,
}

/// Outcome of a producer-side delivery attempt.
pub(crate) enum Delivery<T> {
    /// Enqueued; the worker may continue.
    Delivered,
    /// The queue is at the bound; the element comes back to be parked.
    Full(T),
    /// The SVar is closed; the worker should exit silently.
    Closed,
}

/// The stream variable: a bounded buffer binding concurrent producer
/// workers to a single consumer.
pub struct SVar<T> {
    style: Style,
    bound: usize,
    limit: Option<usize>,
    /// Telemetry id; labels this SVar in trace output.
    account: u64,
    /// Back-reference handed to workers, so they never keep the consumer's
    /// scheduler alive on their own.
    weak: Weak<SVar<T>>,
    /// Workers that have not yet posted their stop event. Parked branches
    /// keep their count; only fresh dispatches pass the CAS gate.
    active: AtomicUsize,
    /// Rung by producers whenever the consumer asked to be woken.
    doorbell: Notify,
    state: Mutex<State<T>>,
}

struct State<T> {
    output: VecDeque<Event<T>>,
    /// Count of `Value` events in `output`; control events are exempt
    /// from the bound.
    buffered: usize,
    work: VecDeque<Branch<T>>,
    /// Set by the consumer before it waits; cleared by the producer that
    /// rings, so redundant wakeups are skipped.
    need_doorbell: bool,
    phase: Phase,
    handles: Vec<JoinHandle<()>>,
    next_worker: u64,
}

impl<T: Send + 'static> SVar<T> {
    /// Create a stream variable with the given style and parameters.
    pub fn new(style: Style, config: SVarConfig) -> Arc<Self> {
        assert!(config.bound > 0, "output bound must be positive");
        let sv = Arc::new_cyclic(|weak| SVar {
            style,
            bound: config.bound,
            limit: config.limit,
            account: next_account_id(),
            weak: weak.clone(),
            active: AtomicUsize::new(0),
            doorbell: Notify::new(),
            state: Mutex::new(State {
                output: VecDeque::new(),
                buffered: 0,
                work: VecDeque::new(),
                need_doorbell: false,
                phase: Phase::Open,
                handles: Vec::new(),
                next_worker: 0,
            }),
        });
        tracing::debug!(
            "[svar {}] created ({:?}/{:?}, bound {}, limit {:?})",
            sv.account,
            style.tag,
            style.sched,
            config.bound,
            config.limit
        );
        sv
    }

    /// Queue a producer stream on this SVar.
    ///
    /// Under the fair (FIFO) discipline the branch is dispatched
    /// immediately; otherwise it waits for the consumer to ask for more
    /// output. Pushing onto a closed SVar drops the stream.
    pub fn push(&self, stream: Stream<T>) {
        let mut st = self.state.lock();
        if st.phase == Phase::Closed {
            return;
        }
        self.enqueue_locked(&mut st, Branch {
            stream,
            resumed: None,
        });
        if self.style.sched == Sched::Fifo {
            self.dispatch_locked(&mut st);
        }
        // A sleeping consumer must wake to dispatch what we queued.
        self.ring_locked(&mut st);
    }

    /// Dispatch one queued branch now, if any.
    pub(crate) fn dispatch_one(&self) {
        let mut st = self.state.lock();
        self.dispatch_locked(&mut st);
    }

    fn enqueue_locked(&self, st: &mut State<T>, branch: Branch<T>) {
        match self.style.sched {
            Sched::Lifo => st.work.push_front(branch),
            Sched::Fifo => st.work.push_back(branch),
        }
    }

    /// Spawn a worker for the first dispatchable branch in queue order.
    ///
    /// Fresh branches pass the worker-limit CAS; parked continuations
    /// resume under the count they already hold. A fresh branch held back
    /// by the limit must not shadow a parked one behind it: the parked
    /// worker's count is what exhausted the limit, so skipping past it is
    /// the only way the queue can drain.
    fn dispatch_locked(&self, st: &mut State<T>) {
        if st.phase == Phase::Closed {
            return;
        }
        let mut pick = None;
        let mut fresh_blocked = false;
        for (i, branch) in st.work.iter().enumerate() {
            if branch.resumed.is_some() {
                pick = Some(i);
                break;
            }
            if !fresh_blocked {
                if self.try_claim_worker() {
                    pick = Some(i);
                    break;
                }
                // At the cap; only parked continuations may pass now.
                fresh_blocked = true;
            }
        }
        let Some(i) = pick else { return };
        let branch = st.work.remove(i).expect("picked branch index");
        let id = match branch.resumed {
            Some(id) => id,
            None => {
                let id = st.next_worker;
                st.next_worker += 1;
                id
            }
        };
        st.handles.retain(|h| !h.is_finished());
        let task = tokio::spawn(worker::run(self.weak.clone(), id, branch.stream));
        st.handles.push(task);
        tracing::trace!("[svar {}] dispatched worker {}", self.account, id);
    }

    /// Claim a worker slot, honoring the style's concurrency cap.
    fn try_claim_worker(&self) -> bool {
        let cap = match (self.style.tag, self.limit) {
            (Tag::Serial, _) => 1,
            (Tag::Parallel, Some(limit)) => limit,
            (Tag::Parallel, None) => usize::MAX,
        };
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < cap).then_some(n + 1)
            })
            .is_ok()
    }

    /// Deliver one element, unless the queue is at the bound.
    pub(crate) fn send_value(&self, x: T) -> Delivery<T> {
        let mut st = self.state.lock();
        if st.phase == Phase::Closed {
            return Delivery::Closed;
        }
        if st.buffered >= self.bound {
            return Delivery::Full(x);
        }
        st.output.push_back(Event::Value(x));
        st.buffered += 1;
        self.ring_locked(&mut st);
        Delivery::Delivered
    }

    /// Deliver a worker error and the worker's stop accounting.
    pub(crate) fn send_error(&self, err: StreamError, id: u64) {
        let mut st = self.state.lock();
        if st.phase == Phase::Closed {
            return;
        }
        tracing::debug!("[svar {}] worker {} failed: {}", self.account, id, err);
        st.output.push_back(Event::Error(err));
        st.output.push_back(Event::ChildStop(id));
        self.ring_locked(&mut st);
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    /// Post the worker's stop event and release its count.
    pub(crate) fn child_stop(&self, id: u64) {
        let mut st = self.state.lock();
        if st.phase == Phase::Closed {
            return;
        }
        st.output.push_back(Event::ChildStop(id));
        self.ring_locked(&mut st);
        self.active.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!("[svar {}] worker {} stopped", self.account, id);
    }

    /// Park a continuation for later dispatch. The worker's count stays
    /// claimed; a resume does not pass the limit gate again.
    pub(crate) fn park(&self, stream: Stream<T>, id: u64) {
        let mut st = self.state.lock();
        if st.phase == Phase::Closed {
            // Dropping the continuation here runs its release guards.
            return;
        }
        self.enqueue_locked(&mut st, Branch {
            stream,
            resumed: Some(id),
        });
        tracing::trace!("[svar {}] worker {} parked on full buffer", self.account, id);
        // The consumer may already be waiting on an empty queue for work
        // it has to dispatch itself.
        self.ring_locked(&mut st);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().phase == Phase::Closed
    }

    fn ring_locked(&self, st: &mut State<T>) {
        if st.need_doorbell {
            st.need_doorbell = false;
            self.doorbell.notify_one();
        }
    }

    /// Pull the next element for the single consumer.
    ///
    /// Returns `Ok(None)` when the stream has terminated: no buffered
    /// output, no live workers, no queued work. A delivered worker error
    /// aborts the SVar and surfaces as `Err` exactly once; values buffered
    /// behind the error are discarded.
    pub(crate) async fn pull(&self) -> Result<Option<T>> {
        loop {
            // Arm the wakeup before re-checking state so a ring between
            // the check and the await is not lost.
            let notified = self.doorbell.notified();
            {
                let mut st = self.state.lock();
                match st.output.pop_front() {
                    Some(Event::Value(x)) => {
                        st.buffered -= 1;
                        return Ok(Some(x));
                    }
                    Some(Event::Error(e)) => {
                        self.close_locked(&mut st, "worker error");
                        return Err(e);
                    }
                    Some(Event::ChildStop(id)) => {
                        tracing::trace!("[svar {}] reaped worker {}", self.account, id);
                        continue;
                    }
                    None => {}
                }
                if self.active.load(Ordering::Acquire) == 0 && st.work.is_empty() {
                    self.close_locked(&mut st, "drained");
                    return Ok(None);
                }
                if st.phase == Phase::Open && st.work.is_empty() {
                    st.phase = Phase::Draining;
                    tracing::trace!("[svar {}] draining", self.account);
                }
                st.need_doorbell = true;
                if !st.work.is_empty() && st.buffered < self.bound {
                    self.dispatch_locked(&mut st);
                }
            }
            notified.await;
        }
    }

    /// Abort: cancel live workers, clear both queues, release resources.
    fn close_locked(&self, st: &mut State<T>, reason: &str) {
        if st.phase == Phase::Closed {
            return;
        }
        st.phase = Phase::Closed;
        for handle in st.handles.drain(..) {
            handle.abort();
        }
        // Dropping parked continuations and undelivered values runs any
        // release guards they carry.
        st.work.clear();
        st.output.clear();
        st.buffered = 0;
        self.active.store(0, Ordering::Release);
        tracing::debug!("[svar {}] closed ({})", self.account, reason);
    }

    /// The style this SVar was created with.
    pub fn style(&self) -> Style {
        self.style
    }

    /// Telemetry id of this SVar.
    pub fn account(&self) -> u64 {
        self.account
    }

    /// Number of buffered elements awaiting the consumer. Never exceeds
    /// the configured bound.
    pub fn queued(&self) -> usize {
        self.state.lock().buffered
    }

    /// Number of workers that have not yet posted their stop event,
    /// parked continuations included.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Number of branches awaiting dispatch.
    pub fn pending_work(&self) -> usize {
        self.state.lock().work.len()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }
}

impl<T> Drop for SVar<T> {
    fn drop(&mut self) {
        // The consumer is gone; make sure no worker task outlives us.
        let st = self.state.get_mut();
        st.phase = Phase::Closed;
        for handle in st.handles.drain(..) {
            handle.abort();
        }
    }
}
