#![allow(missing_docs)]
#![cfg(feature = "loom")]

use cjs::{
    completed::CompletedSet,
    consumer::ConsumerPool,
    job::{Job, JobId},
    queue::JobQueue,
    runner::{ExecutionError, JobRunner},
    types::SharedJob,
};
use core::{fmt, num::NonZeroU32, time::Duration};
use loom::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::sync::Arc;

fn id(seq: u32) -> JobId {
    JobId::new(0, seq)
}

fn job(seq: u32, deps: &[u32]) -> SharedJob {
    let deps = deps.iter().copied().map(id).collect();
    Arc::new(Job::new(id(seq), NonZeroU32::MIN, deps).unwrap())
}

fn model(f: impl Fn() + Sync + Send + 'static) {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(2);
    builder.check(f);
}

/// Records the order in which jobs were executed.
struct Recorder {
    executed: Mutex<Vec<JobId>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
        }
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Recorder")
    }
}

impl JobRunner for Recorder {
    fn run(&self, job: &Job) -> Result<(), ExecutionError> {
        self.executed.lock().unwrap().push(job.id());
        Ok(())
    }
}

#[test]
fn loom_put_returns_once_the_only_slot_is_dequeued() {
    loom::model(|| {
        let queue = Arc::new(JobQueue::new(1).unwrap());
        let second_put_returned = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = queue.clone();
            let second_put_returned = second_put_returned.clone();
            loom::thread::spawn(move || {
                queue.put(job(0, &[])).unwrap();
                queue.put(job(1, &[])).unwrap();
                second_put_returned.store(true, Ordering::SeqCst);
            })
        };

        // Nothing has been dequeued yet, so the second put cannot be done.
        assert!(!second_put_returned.load(Ordering::SeqCst));
        let first = queue.get().unwrap();
        assert_eq!(first.id(), id(0));
        // The dequeue alone frees the slot.
        producer.join().unwrap();
        assert!(second_put_returned.load(Ordering::SeqCst));
        assert_eq!(queue.len(), 1);
        queue.mark_done(first.id()).unwrap();

        let second = queue.get().unwrap();
        assert_eq!(second.id(), id(1));
        queue.mark_done(second.id()).unwrap();
        queue.join();
        assert_eq!(queue.in_flight(), 0);
    });
}

#[test]
fn loom_blocked_job_is_requeued_until_its_dependency_completes() {
    model(|| {
        let queue = Arc::new(JobQueue::new(2).unwrap());
        let completed = Arc::new(CompletedSet::new());
        let recorder = Arc::new(Recorder::new());
        // The dependent sits at the head, so the consumer must requeue it.
        queue.put(job(1, &[0])).unwrap();
        queue.put(job(0, &[])).unwrap();

        let pool = ConsumerPool::start(
            1,
            queue.clone(),
            completed.clone(),
            recorder.clone(),
            Duration::ZERO,
        )
        .unwrap();
        queue.join();
        pool.shutdown().unwrap();

        assert_eq!(completed.sorted(), [id(0), id(1)]);
        assert_eq!(*recorder.executed.lock().unwrap(), [id(0), id(1)]);
    });
}

#[test]
fn loom_two_consumers_complete_each_job_once() {
    model(|| {
        let queue = Arc::new(JobQueue::new(2).unwrap());
        let completed = Arc::new(CompletedSet::new());
        let recorder = Arc::new(Recorder::new());
        let jobs = [job(0, &[]), job(1, &[])];
        for job in &jobs {
            queue.put(job.clone()).unwrap();
        }

        let pool = ConsumerPool::start(
            2,
            queue.clone(),
            completed.clone(),
            recorder.clone(),
            Duration::ZERO,
        )
        .unwrap();
        queue.join();
        pool.shutdown().unwrap();

        assert_eq!(completed.sorted(), [id(0), id(1)]);
        assert!(jobs.iter().all(|job| job.is_completed()));
        let mut executed = recorder.executed.lock().unwrap().clone();
        executed.sort();
        assert_eq!(executed, [id(0), id(1)]);
    });
}
