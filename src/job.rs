use crate::sync::{Mutex, lock};
use core::num::NonZeroU32;
use derive_more::Display;
use thiserror::Error;

/// Unique identifier of a job within a run.
///
/// Composed of the index of the producer that generated the job and the
/// job's sequence number within that producer, so identifiers from
/// different producers never collide. Ordering is by producer first, then
/// by sequence number.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("producer-{producer}-job-{seq}")]
pub struct JobId {
    producer: u16,
    seq: u32,
}

impl JobId {
    #[must_use]
    pub const fn new(producer: u16, seq: u32) -> Self {
        Self { producer, seq }
    }

    #[must_use]
    pub const fn producer(self) -> u16 {
        self.producer
    }

    #[must_use]
    pub const fn seq(self) -> u32 {
        self.seq
    }
}

/// Error returned by [`Job::new`] when the requested job would violate a
/// job invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum JobError {
    /// The job lists itself among its dependencies.
    #[error("job {0} depends on itself")]
    SelfDependency(JobId),
}

/// A schedulable unit of work.
///
/// Identity and cost are fixed at creation. The dependency list and the
/// completion flag live behind the job's own lock, independent of the
/// shared completed-set, so a consumer may inspect a job while another
/// thread marks a different job complete.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    duration_hint: NonZeroU32,
    state: Mutex<JobState>,
}

#[derive(Debug)]
struct JobState {
    dependencies: Vec<JobId>,
    completed: bool,
}

impl Job {
    /// # Errors
    /// If `dependencies` contains `id`.
    pub fn new(
        id: JobId,
        duration_hint: NonZeroU32,
        dependencies: Vec<JobId>,
    ) -> Result<Self, JobError> {
        if dependencies.contains(&id) {
            return Err(JobError::SelfDependency(id));
        }
        Ok(Self {
            id,
            duration_hint,
            state: Mutex::new(JobState {
                dependencies,
                completed: false,
            }),
        })
    }

    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Simulated cost in ticks.
    #[must_use]
    pub fn duration_hint(&self) -> NonZeroU32 {
        self.duration_hint
    }

    /// Snapshot of the current dependency list.
    #[must_use]
    pub fn dependencies(&self) -> Vec<JobId> {
        lock(&self.state).dependencies.clone()
    }

    /// Run `f` over the dependency list without cloning it.
    pub fn with_dependencies<R>(&self, f: impl FnOnce(&[JobId]) -> R) -> R {
        f(&lock(&self.state).dependencies)
    }

    #[must_use]
    pub fn has_dependencies(&self) -> bool {
        !lock(&self.state).dependencies.is_empty()
    }

    /// Drop every dependency and return the ones that were removed.
    pub fn clear_dependencies(&self) -> Vec<JobId> {
        core::mem::take(&mut lock(&self.state).dependencies)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        lock(&self.state).completed
    }

    /// Set the completion flag.
    ///
    /// Returns `false` if the job had already been completed, in which case
    /// nothing changes.
    pub fn mark_completed(&self) -> bool {
        let mut state = lock(&self.state);
        if state.completed {
            return false;
        }
        state.completed = true;
        true
    }
}
