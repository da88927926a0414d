use crate::{
    gate::{self, Readiness},
    job::{Job, JobId},
    sync::{Mutex, lock},
    types::HashSet,
};

/// Shared record of job outcomes, guarded by a single lock.
///
/// Both sets only ever grow. The lock may be held while a job's own lock is
/// taken (during [`assess`](Self::assess)); callers must never hold a job
/// lock while calling into this type.
#[derive(Debug)]
pub struct CompletedSet {
    inner: Mutex<Outcomes>,
}

#[derive(Debug, Default)]
struct Outcomes {
    completed: HashSet<JobId>,
    failed: HashSet<JobId>,
}

impl CompletedSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Outcomes::default()),
        }
    }

    /// Record a successful execution. Returns `false` if `id` was already
    /// recorded as completed.
    pub fn insert(&self, id: JobId) -> bool {
        lock(&self.inner).completed.insert(id)
    }

    /// Record that `id` failed or was abandoned. Returns `false` if it was
    /// already recorded as failed.
    pub fn record_failure(&self, id: JobId) -> bool {
        lock(&self.inner).failed.insert(id)
    }

    #[must_use]
    pub fn contains(&self, id: JobId) -> bool {
        lock(&self.inner).completed.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner).completed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// [`gate::assess`] against the current outcomes.
    #[must_use]
    pub fn assess(&self, job: &Job) -> Readiness {
        let outcomes = lock(&self.inner);
        gate::assess(job, &outcomes.completed, &outcomes.failed)
    }

    /// Completed IDs in ascending order.
    #[must_use]
    pub fn sorted(&self) -> Vec<JobId> {
        sorted(&lock(&self.inner).completed)
    }

    /// Failed or abandoned IDs in ascending order.
    #[must_use]
    pub fn sorted_failures(&self) -> Vec<JobId> {
        sorted(&lock(&self.inner).failed)
    }
}

impl Default for CompletedSet {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(ids: &HashSet<JobId>) -> Vec<JobId> {
    let mut ids: Vec<_> = ids.iter().copied().collect();
    ids.sort_unstable();
    ids
}
