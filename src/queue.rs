use crate::{
    config::ConfigError,
    job::JobId,
    sync::{Condvar, Mutex, lock, wait},
    types::SharedJob,
};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, trace};

/// Error kind for queue operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueError {
    /// The queue was closed; the job was not accepted.
    #[error("queue is closed, job {0} was not accepted")]
    Closed(JobId),
    /// `mark_done`/`requeue` was called with no fetched job outstanding.
    #[error("job {0} was marked done more times than jobs were fetched")]
    TooManyDone(JobId),
}

/// Bounded, blocking FIFO of jobs shared by producers and consumers.
///
/// A job occupies a slot from the moment it is `put` until a consumer fetches
/// it with [`get`](Self::get). Jobs put back through
/// [`requeue`](Self::requeue) wait behind the fresh ones but hold no slot:
/// a consumer can always return a blocked job, and jobs waiting on
/// dependencies never keep producers from finishing.
///
/// Every job that was `put` is counted as in flight until it is marked done;
/// [`join`](Self::join) waits for that count to reach zero.
#[derive(Debug)]
pub struct JobQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    drained: Condvar,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Queued>,
    /// Buffered jobs that came through `put`. Only these count against the
    /// capacity.
    fresh: usize,
    /// Jobs handed out by `get` that were neither requeued nor marked done.
    checked_out: usize,
    /// Jobs put and not yet marked done. Always `>= checked_out`.
    unfinished: usize,
    closed: bool,
}

#[derive(Debug)]
struct Queued {
    job: SharedJob,
    requeued: bool,
}

impl JobQueue {
    /// # Errors
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                ..QueueState::default()
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            drained: Condvar::new(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs waiting to be fetched, re-queued ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs put but not yet marked done.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.state).unfinished
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Append `job` at the tail, blocking while `capacity` freshly put jobs
    /// are waiting to be fetched.
    ///
    /// # Errors
    /// If the queue is closed before a slot frees up.
    pub fn put(&self, job: SharedJob) -> Result<(), QueueError> {
        let id = job.id();
        let mut state = lock(&self.state);
        while !state.closed && state.fresh >= self.capacity {
            trace!(job = %id, capacity = self.capacity, "queue full, waiting for a slot");
            state = wait(&self.not_full, state);
        }
        if state.closed {
            return Err(QueueError::Closed(id));
        }
        state.items.push_back(Queued {
            job,
            requeued: false,
        });
        state.fresh += 1;
        state.unfinished += 1;
        let depth = state.items.len();
        drop(state);
        self.not_empty.notify_one();
        debug!(job = %id, depth, "job enqueued");
        Ok(())
    }

    /// Remove the job at the head, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed, even if jobs remain buffered.
    pub fn get(&self) -> Option<SharedJob> {
        let mut state = lock(&self.state);
        loop {
            if state.closed {
                return None;
            }
            if let Some(Queued { job, requeued }) = state.items.pop_front() {
                state.checked_out += 1;
                if !requeued {
                    state.fresh -= 1;
                }
                let depth = state.items.len();
                drop(state);
                if !requeued {
                    self.not_full.notify_one();
                }
                debug!(job = %job.id(), depth, "job dequeued");
                return Some(job);
            }
            state = wait(&self.not_empty, state);
        }
    }

    /// Put a fetched job back at the tail and mark the fetch done.
    ///
    /// Never blocks: re-queued jobs are kept apart from the capacity count.
    ///
    /// # Errors
    /// - [`QueueError::TooManyDone`] if no fetched job is outstanding.
    /// - [`QueueError::Closed`] if the queue was closed; the job is dropped
    ///   and its fetch counts as done.
    pub fn requeue(&self, job: SharedJob) -> Result<(), QueueError> {
        let id = job.id();
        let mut state = lock(&self.state);
        if state.checked_out == 0 {
            return Err(QueueError::TooManyDone(id));
        }
        state.checked_out -= 1;
        if state.closed {
            state.unfinished -= 1;
            return Err(QueueError::Closed(id));
        }
        state.items.push_back(Queued {
            job,
            requeued: true,
        });
        let depth = state.items.len();
        drop(state);
        self.not_empty.notify_one();
        debug!(job = %id, depth, "job requeued");
        Ok(())
    }

    /// Record that the fetched job `id` has been fully processed.
    ///
    /// # Errors
    /// If no fetched job is outstanding.
    pub fn mark_done(&self, id: JobId) -> Result<(), QueueError> {
        let mut state = lock(&self.state);
        if state.checked_out == 0 {
            return Err(QueueError::TooManyDone(id));
        }
        state.checked_out -= 1;
        state.unfinished -= 1;
        let in_flight = state.unfinished;
        let depth = state.items.len();
        drop(state);
        if in_flight == 0 {
            self.drained.notify_all();
        }
        debug!(job = %id, depth, in_flight, "job marked done");
        Ok(())
    }

    /// Block until every job put so far has been marked done, or the queue
    /// is closed.
    pub fn join(&self) {
        let mut state = lock(&self.state);
        while state.unfinished > 0 && !state.closed {
            state = wait(&self.drained, state);
        }
    }

    /// Stop accepting and handing out jobs, waking every blocked caller.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        state.closed = true;
        let abandoned = state.items.len();
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        self.drained.notify_all();
        debug!(abandoned, "queue closed");
    }
}
