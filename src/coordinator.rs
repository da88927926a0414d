use crate::{
    completed::CompletedSet,
    config::{ConfigError, SchedulerConfig},
    consumer::{ConsumerError, ConsumerPool},
    cycle,
    job::JobId,
    producer::{ProducerError, ProducerPool},
    queue::JobQueue,
    resolve::{ClearDependencies, ResolutionPolicy},
    runner::{JobRunner, SimulatedRunner},
    types::{HashSet, IndexSet, SharedJob},
};
use derive_more::Display;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Error returned by [`Coordinator::run`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Consumer(#[from] ConsumerError),
    #[error(transparent)]
    Producer(#[from] ProducerError),
    /// Two producers emitted the same job ID.
    #[error("job {0} was generated more than once")]
    DuplicateJobId(JobId),
    /// The resolution policy did not make the batch acyclic. This is a bug
    /// in the policy.
    #[error("cycle resolution left {} job(s) deadlocked: {:?}", .0.len(), .0)]
    UnresolvedCycle(Vec<JobId>),
    /// `run` was called on a coordinator that had already started.
    #[error("coordinator already ran (currently {0})")]
    AlreadyStarted(Phase),
}

/// Lifecycle of a [`Coordinator`]. A run moves through every phase once, in
/// declaration order.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    ConsumersStarted,
    ProducersRunning,
    ProducersJoined,
    CycleChecked,
    Draining,
    Done,
}

/// Outcome of a finished run.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Successfully executed jobs, ascending.
    pub completed: Vec<JobId>,
    /// Jobs whose execution failed or whose dependencies failed, ascending.
    pub failed: Vec<JobId>,
    /// Jobs found in or behind a dependency cycle before resolution,
    /// ascending.
    pub deadlocked: Vec<JobId>,
    /// Number of jobs the producers generated.
    pub generated: usize,
}

/// Wires producers, the queue, consumers and the cycle pass together for a
/// single run.
#[derive(Debug)]
pub struct Coordinator {
    config: SchedulerConfig,
    producers: ProducerPool,
    runner: Arc<dyn JobRunner>,
    policy: Box<dyn ResolutionPolicy>,
    phase: Phase,
}

impl Coordinator {
    /// Random producers, simulated execution and [`ClearDependencies`]
    /// resolution, all as described by `config`.
    ///
    /// # Errors
    /// If `config` is invalid.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let runner = SimulatedRunner::new(config.tick)
            .with_failure_probability(config.failure_probability);
        Ok(Self {
            producers: ProducerPool::from_config(&config),
            runner: Arc::new(runner),
            policy: Box::new(ClearDependencies),
            phase: Phase::Idle,
            config,
        })
    }

    /// Replace the configured random producers.
    #[must_use]
    pub fn with_producers(mut self, producers: ProducerPool) -> Self {
        self.producers = producers;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn ResolutionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run producers and consumers to completion.
    ///
    /// Consumers start first, so jobs are processed while producers are
    /// still generating. Once every producer has finished, the whole batch
    /// is checked for dependency cycles exactly once; detected cycles are
    /// broken by the resolution policy. The call then waits until every job,
    /// including re-queued ones, has been processed.
    ///
    /// # Errors
    /// See [`SchedulerError`]. On error the consumer pool is stopped before
    /// returning.
    pub fn run(&mut self) -> Result<RunReport, SchedulerError> {
        if self.phase != Phase::Idle {
            return Err(SchedulerError::AlreadyStarted(self.phase));
        }
        info!(
            producers = self.producers.len(),
            consumers = self.config.consumers,
            capacity = self.config.queue_capacity,
            "starting job scheduler"
        );
        let queue = Arc::new(JobQueue::new(self.config.queue_capacity)?);
        let completed = Arc::new(CompletedSet::new());

        let consumers = ConsumerPool::start(
            self.config.consumers,
            queue.clone(),
            completed.clone(),
            self.runner.clone(),
            self.config.requeue_backoff,
        )?;
        self.advance(Phase::ConsumersStarted);

        self.advance(Phase::ProducersRunning);
        let jobs = self.producers.run(&queue)?;
        self.advance(Phase::ProducersJoined);

        ensure_unique(&jobs)?;
        let deadlocked = self.break_cycles(jobs.as_slice())?;
        self.advance(Phase::CycleChecked);

        self.advance(Phase::Draining);
        queue.join();
        consumers.shutdown()?;
        self.advance(Phase::Done);

        let report = RunReport {
            completed: completed.sorted(),
            failed: completed.sorted_failures(),
            deadlocked: sorted(deadlocked),
            generated: jobs.len(),
        };
        info!(
            generated = report.generated,
            completed = report.completed.len(),
            failed = report.failed.len(),
            "job scheduler completed"
        );
        Ok(report)
    }

    /// Single detection and resolution pass over the full batch. Returns the
    /// jobs that were deadlocked before resolution.
    fn break_cycles(&self, jobs: &[SharedJob]) -> Result<IndexSet<JobId>, SchedulerError> {
        let deadlocked = cycle::find_deadlocked(jobs);
        if deadlocked.is_empty() {
            info!("no deadlock detected");
            return Ok(deadlocked);
        }
        warn!(jobs = ?deadlocked, "deadlock detected");
        let resolved = self.policy.resolve(&deadlocked, jobs.to_vec());
        let residual = cycle::find_deadlocked(&resolved);
        if !residual.is_empty() {
            error!(policy = ?self.policy, jobs = ?residual, "resolution left jobs deadlocked");
            return Err(SchedulerError::UnresolvedCycle(sorted(residual)));
        }
        info!(policy = ?self.policy, jobs = deadlocked.len(), "deadlock resolved");
        Ok(deadlocked)
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "Coordinator::advance: [1]");
        info!(from = %self.phase, to = %next, "coordinator phase");
        self.phase = next;
    }
}

fn ensure_unique(jobs: &[SharedJob]) -> Result<(), SchedulerError> {
    let mut seen = HashSet::with_capacity_and_hasher(jobs.len(), FxBuildHasher);
    for job in jobs {
        if !seen.insert(job.id()) {
            return Err(SchedulerError::DuplicateJobId(job.id()));
        }
    }
    Ok(())
}

fn sorted(ids: IndexSet<JobId>) -> Vec<JobId> {
    let mut ids: Vec<_> = ids.into_iter().collect();
    ids.sort_unstable();
    ids
}
