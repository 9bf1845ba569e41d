use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine_logging::{engine_trace, set_virtual_clock_ms};
use tokio::task::AbortHandle;

use crate::channel::lock;

pub type TimerTask = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Cooperative timer queue used by event sources.
pub trait Scheduler: Send + Sync {
    /// Runs `task` once `after` has elapsed, unless cancelled first.
    fn schedule(&self, after: Duration, task: TimerTask) -> TimerId;
    /// Drops a pending task. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

#[derive(Default)]
struct VirtualQueue {
    now: Duration,
    next_id: u64,
    /// Keyed by deadline, then id, so equal deadlines fire in scheduling order.
    pending: BTreeMap<(Duration, u64), TimerTask>,
}

/// Deterministic scheduler: time only moves when a test advances it.
///
/// While a task runs, the `engine_logging` virtual clock carries the
/// logical time so log lines read in run time rather than wall time.
#[derive(Default)]
pub struct VirtualScheduler {
    queue: Mutex<VirtualQueue>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        lock(&self.queue).now
    }

    pub fn pending(&self) -> usize {
        lock(&self.queue).pending.len()
    }

    /// Moves the clock forward by `by`, running every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        self.run_while(|deadline| deadline <= target, Some(target))
    }

    /// Runs tasks until the queue is empty, including tasks scheduled by
    /// the tasks it runs.
    pub fn run_until_idle(&self) -> usize {
        self.run_while(|_| true, None)
    }

    fn run_while(&self, due: impl Fn(Duration) -> bool, settle_at: Option<Duration>) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut queue = lock(&self.queue);
                let key = queue.pending.keys().next().copied();
                match key {
                    Some(key) if due(key.0) => {
                        queue.now = key.0;
                        queue.pending.remove(&key).map(|task| (key.0, task))
                    }
                    _ => {
                        if let Some(target) = settle_at {
                            queue.now = queue.now.max(target);
                        }
                        None
                    }
                }
            };
            let Some((at, task)) = next else {
                break;
            };
            set_virtual_clock_ms(Some(at.as_millis() as u64));
            task();
            set_virtual_clock_ms(None);
            ran += 1;
        }
        ran
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&self, after: Duration, task: TimerTask) -> TimerId {
        let mut queue = lock(&self.queue);
        queue.next_id += 1;
        let id = queue.next_id;
        let deadline = queue.now + after;
        queue.pending.insert((deadline, id), task);
        engine_trace!("Virtual timer {id} due at {}ms", deadline.as_millis());
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        lock(&self.queue).pending.retain(|(_, pending), _| *pending != id.0);
    }
}

/// Real-time scheduler on a tokio runtime; cancellation aborts the sleeping task.
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioScheduler {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, after: Duration, task: TimerTask) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let tasks = Arc::clone(&self.tasks);
        // Held across spawn so the task cannot deregister before it is registered.
        let mut registry = lock(&self.tasks);
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            lock(&tasks).remove(&id);
            task();
        });
        registry.insert(id, join.abort_handle());
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        if let Some(handle) = lock(&self.tasks).remove(&id.0) {
            handle.abort();
        }
    }
}
