use crate::{
    job::{Job, JobId},
    sync::pause,
};
use core::{fmt::Debug, time::Duration};
use rand::Rng;
use thiserror::Error;
use tracing::info;

/// A job's execution failed. The job is not retried and never counts as
/// completed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("job {job} failed: {reason}")]
pub struct ExecutionError {
    pub job: JobId,
    pub reason: String,
}

/// Executes the work a job stands for.
///
/// Called by consumer workers only after every dependency of `job` has
/// completed. Implementations may block for as long as the work takes.
pub trait JobRunner: Debug + Send + Sync {
    /// # Errors
    /// If the work failed.
    fn run(&self, job: &Job) -> Result<(), ExecutionError>;
}

/// Stand-in for real work: sleeps `duration_hint` ticks and optionally
/// fails at random.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedRunner {
    tick: Duration,
    failure_probability: f64,
}

impl SimulatedRunner {
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            failure_probability: 0.0,
        }
    }

    /// Make each execution fail with the given probability, clamped to
    /// `[0, 1]`.
    #[must_use]
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl JobRunner for SimulatedRunner {
    fn run(&self, job: &Job) -> Result<(), ExecutionError> {
        let ticks = job.duration_hint().get();
        info!(job = %job.id(), ticks, "executing job");
        pause(self.tick.saturating_mul(ticks));
        if self.failure_probability > 0.0 && rand::thread_rng().gen_bool(self.failure_probability)
        {
            return Err(ExecutionError {
                job: job.id(),
                reason: "simulated failure".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use core::num::NonZeroU32;

    #[test]
    fn certain_failure_is_reported() {
        let job = Job::new(JobId::new(0, 0), NonZeroU32::MIN, vec![]).unwrap();
        let runner = SimulatedRunner::new(Duration::ZERO).with_failure_probability(1.0);
        assert_eq!(
            runner.run(&job),
            Err(ExecutionError {
                job: job.id(),
                reason: "simulated failure".to_owned(),
            })
        );
        assert_eq!(SimulatedRunner::new(Duration::ZERO).run(&job), Ok(()));
    }
}
