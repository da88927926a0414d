use crate::{
    config::SchedulerConfig,
    job::{Job, JobId},
    queue::{JobQueue, QueueError},
    sync::pause,
    types::SharedJob,
};
use core::{fmt::Debug, num::NonZeroU32, time::Duration};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Error kind for a producer pool run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProducerError {
    /// The dedicated producer threads could not be started.
    #[error("failed to start producer threads")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// A producer could not hand a job to the queue.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Something that generates jobs into the shared queue.
///
/// `produce` must return every job it handed to the queue, in creation
/// order; the coordinator analyzes that batch for cycles.
pub trait JobSource: Debug + Send + Sync {
    /// Label used in logs.
    fn name(&self) -> String;
    /// Create jobs and `put` each of them into `queue`.
    ///
    /// # Errors
    /// If the queue refuses a job.
    fn produce(&self, queue: &JobQueue) -> Result<Vec<SharedJob>, QueueError>;
}

/// Generates `job_count` jobs with random costs and random dependencies on
/// its own earlier jobs.
#[derive(Debug, Clone)]
pub struct RandomProducer {
    index: u16,
    job_count: u32,
    max_duration: NonZeroU32,
    dependency_probability: f64,
    tick: Duration,
    seed: Option<u64>,
}

impl RandomProducer {
    /// Producer number `index` of a run described by `config`.
    ///
    /// `config` is expected to be validated; out-of-range values are clamped.
    #[must_use]
    pub fn new(index: u16, config: &SchedulerConfig) -> Self {
        Self {
            index,
            job_count: config.jobs_per_producer,
            max_duration: NonZeroU32::new(config.max_duration).unwrap_or(NonZeroU32::MIN),
            dependency_probability: config.dependency_probability.clamp(0.0, 1.0),
            tick: config.tick,
            seed: config.seed.map(|seed| seed.wrapping_add(u64::from(index))),
        }
    }
}

impl JobSource for RandomProducer {
    fn name(&self) -> String {
        format!("producer-{}", self.index)
    }

    fn produce(&self, queue: &JobQueue) -> Result<Vec<SharedJob>, QueueError> {
        let mut rng = self
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        // Each producer works within its own cost range, as if it served a
        // different class of work.
        let max_duration = rng.gen_range(1..=self.max_duration.get());
        let mut created: Vec<SharedJob> = Vec::with_capacity(self.job_count as usize);
        for seq in 0..self.job_count {
            let id = JobId::new(self.index, seq);
            let duration = NonZeroU32::MIN.saturating_add(rng.gen_range(0..max_duration));
            let dependencies: Vec<_> =
                if !created.is_empty() && rng.gen_bool(self.dependency_probability) {
                    let amount = rng.gen_range(1..=created.len());
                    index::sample(&mut rng, created.len(), amount)
                        .into_iter()
                        .map(|i| created[i].id())
                        .collect()
                } else {
                    Vec::new()
                };
            // Dependencies are drawn from earlier jobs only, so they never
            // contain `id`.
            let job = Arc::new(
                Job::new(id, duration, dependencies).expect("RandomProducer::produce: [1]"),
            );
            info!(
                producer = self.index,
                job = %id,
                duration = duration.get(),
                dependencies = ?job.dependencies(),
                "job created"
            );
            created.push(job.clone());
            queue.put(job)?;
            pause(self.tick.mul_f64(rng.gen_range(0.1..0.5)));
        }
        Ok(created)
    }
}

/// Replays a prepared list of jobs, in order.
#[derive(Debug, Clone)]
pub struct FixedBatch {
    name: String,
    jobs: Vec<SharedJob>,
}

impl FixedBatch {
    #[must_use]
    pub fn new(name: impl Into<String>, jobs: Vec<SharedJob>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }
}

impl JobSource for FixedBatch {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn produce(&self, queue: &JobQueue) -> Result<Vec<SharedJob>, QueueError> {
        for job in &self.jobs {
            queue.put(job.clone())?;
        }
        Ok(self.jobs.clone())
    }
}

/// A fixed set of producers run concurrently, one thread each.
#[derive(Debug, Default)]
pub struct ProducerPool {
    sources: Vec<Box<dyn JobSource>>,
}

impl ProducerPool {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn JobSource>>) -> Self {
        Self { sources }
    }

    /// One [`RandomProducer`] per configured producer.
    #[must_use]
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let sources = (0..config.producers)
            .filter_map(|index| u16::try_from(index).ok())
            .map(|index| Box::new(RandomProducer::new(index, config)) as Box<dyn JobSource>)
            .collect();
        Self { sources }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run every producer to completion and return all generated jobs,
    /// grouped by producer in pool order.
    ///
    /// Returns only once every producer has finished, even if one failed.
    ///
    /// # Errors
    /// If the producer threads cannot be started, or if any producer fails.
    pub fn run(&self, queue: &JobQueue) -> Result<Vec<SharedJob>, ProducerError> {
        if self.sources.is_empty() {
            return Ok(Vec::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.sources.len())
            .thread_name(|i| format!("producer-{i}"))
            .build()?;
        let batches: Vec<_> = pool.install(|| {
            self.sources
                .par_iter()
                .map(|source| {
                    let name = source.name();
                    info!(producer = %name, "producer started");
                    let produced = source.produce(queue);
                    match &produced {
                        Ok(jobs) => info!(producer = %name, jobs = jobs.len(), "producer finished"),
                        Err(err) => warn!(producer = %name, %err, "producer stopped early"),
                    }
                    produced
                })
                .collect()
        });
        let mut jobs = Vec::new();
        for batch in batches {
            jobs.extend(batch?);
        }
        Ok(jobs)
    }
}
