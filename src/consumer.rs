use crate::{
    completed::CompletedSet,
    gate::Readiness,
    job::JobId,
    queue::JobQueue,
    runner::{ExecutionError, JobRunner},
    sync::{JoinHandle, pause, spawn_worker},
    types::SharedJob,
};
use core::time::Duration;
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error kind for consumer pool lifecycle failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConsumerError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn consumer thread")]
    Spawn(#[from] std::io::Error),
    /// Worker threads died instead of exiting cleanly.
    #[error("{0} consumer worker(s) panicked")]
    WorkerPanicked(usize),
}

/// Fixed set of worker threads draining a [`JobQueue`].
///
/// The pool owns its workers. [`shutdown`](Self::shutdown) closes the queue
/// and joins them; dropping the pool does the same, discarding worker
/// panics.
#[derive(derive_more::Debug)]
pub struct ConsumerPool {
    queue: Arc<JobQueue>,
    #[debug("{} worker(s)", workers.len())]
    workers: Vec<JoinHandle<()>>,
}

/// State shared by every worker of a pool.
#[derive(Debug, Clone)]
struct Consumer {
    queue: Arc<JobQueue>,
    completed: Arc<CompletedSet>,
    runner: Arc<dyn JobRunner>,
    requeue_backoff: Duration,
}

impl ConsumerPool {
    /// Spawn `workers` threads that process jobs from `queue` until it is
    /// closed.
    ///
    /// # Errors
    /// If a thread cannot be spawned. Workers started so far are stopped
    /// before returning.
    pub fn start(
        workers: usize,
        queue: Arc<JobQueue>,
        completed: Arc<CompletedSet>,
        runner: Arc<dyn JobRunner>,
        requeue_backoff: Duration,
    ) -> Result<Self, ConsumerError> {
        let consumer = Consumer {
            queue: queue.clone(),
            completed,
            runner,
            requeue_backoff,
        };
        let mut pool = Self {
            queue,
            workers: Vec::with_capacity(workers),
        };
        for index in 0..workers {
            let consumer = consumer.clone();
            // On error `pool` is dropped, which stops the workers spawned so far.
            let handle = spawn_worker(format!("consumer-{index}"), move || consumer.run())?;
            pool.workers.push(handle);
        }
        info!(workers, "consumer pool started");
        Ok(pool)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Close the queue and wait for every worker to finish its current job
    /// and exit.
    ///
    /// # Errors
    /// If any worker panicked.
    pub fn shutdown(mut self) -> Result<(), ConsumerError> {
        let panicked = self.stop();
        info!("consumer pool has been shut down");
        if panicked == 0 {
            Ok(())
        } else {
            Err(ConsumerError::WorkerPanicked(panicked))
        }
    }

    fn stop(&mut self) -> usize {
        self.queue.close();
        self.workers
            .drain(..)
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count()
    }
}

impl Drop for ConsumerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let panicked = self.stop();
            if panicked > 0 {
                warn!(panicked, "consumer workers panicked");
            }
        }
    }
}

impl Consumer {
    fn run(self) {
        while let Some(job) = self.queue.get() {
            self.process(job);
        }
        debug!("consumer exiting");
    }

    fn process(&self, job: SharedJob) {
        let id = job.id();
        match self.completed.assess(&job) {
            Readiness::Blocked { unmet } => {
                debug!(job = %id, ?unmet, "dependencies unmet, requeueing job");
                if let Err(err) = self.queue.requeue(job) {
                    warn!(job = %id, %err, "requeue rejected");
                }
                pause(self.requeue_backoff);
                return;
            }
            Readiness::Abandoned { failed } => {
                warn!(job = %id, ?failed, "dependency failed, abandoning job");
                self.completed.record_failure(id);
            }
            Readiness::Ready => match self.execute(&job) {
                Ok(()) => {
                    if job.mark_completed() {
                        self.completed.insert(id);
                        info!(job = %id, "job completed");
                    } else {
                        warn!(job = %id, "job was already completed");
                    }
                }
                Err(err) => {
                    error!(job = %id, %err, "error processing job");
                    self.completed.record_failure(id);
                }
            },
        }
        self.done(id);
    }

    /// Run the job, turning a panicking runner into an [`ExecutionError`] so
    /// the worker survives and the queue still drains.
    fn execute(&self, job: &SharedJob) -> Result<(), ExecutionError> {
        catch_unwind(AssertUnwindSafe(|| self.runner.run(job))).unwrap_or_else(|_| {
            Err(ExecutionError {
                job: job.id(),
                reason: "runner panicked".to_owned(),
            })
        })
    }

    fn done(&self, id: JobId) {
        if let Err(err) = self.queue.mark_done(id) {
            error!(job = %id, %err, "queue accounting error");
        }
    }
}
