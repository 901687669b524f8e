//! Work partitioning for the parallel row passes.
//!
//! A [`JobQueue`] is constructed fresh for every generate/apply call and
//! lives only for that call. The orchestrating thread enqueues every row
//! job, closes the queue, then runs the same worker loop as the spawned
//! threads so nobody idles while jobs remain. Jobs carry their disjoint
//! output rows, so workers never synchronize beyond the dequeue.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::types::MAP_SCALE_FACTOR;

/// Row-chunk granularity for multithreaded passes, in image rows.
pub(crate) const JOB_SIZE_IN_ROWS: usize = 16;

// Job granularity must stay aligned to the gain map blocks.
const _: () = assert!(JOB_SIZE_IN_ROWS % MAP_SCALE_FACTOR as usize == 0);

struct QueueState<T> {
    jobs: VecDeque<T>,
    closed: bool,
}

/// Bounded producer/consumer queue of row jobs.
///
/// Lifecycle: open (enqueue allowed, dequeue blocks while empty) → closed
/// (dequeue drains the remainder) → drained (dequeue returns `None` and the
/// worker exits).
pub(crate) struct JobQueue<T> {
    state: Mutex<QueueState<T>>,
    cv: Condvar,
}

impl<T> JobQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Add a job to the back of the queue and wake one waiting worker.
    pub(crate) fn enqueue(&self, job: T) {
        let mut state = self.state.lock();
        state.jobs.push_back(job);
        drop(state);
        self.cv.notify_one();
    }

    /// Mark the queue closed: no further enqueues, workers drain and exit.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.cv.notify_all();
    }

    /// Take the next job, blocking while the queue is open but transiently
    /// empty. Returns `None` once the queue is closed and drained.
    pub(crate) fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            let _ = self.cv.wait_for(&mut state, Duration::from_millis(100));
        }
    }
}

/// Number of workers for a parallel pass, the calling thread included.
///
/// `override_threads` forces an exact count (used by tests pinning
/// determinism); 0 selects `min(available_parallelism, 4)`.
pub(crate) fn worker_count(override_threads: usize) -> usize {
    if override_threads != 0 {
        return override_threads;
    }
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
        .min(4)
}
