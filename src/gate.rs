//! Dependency gate consulted by consumers before executing a job.

use crate::{
    job::{Job, JobId},
    types::HashSet,
};
use tracing::trace;

/// Whether a job may execute given the outcomes recorded so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every dependency has completed.
    Ready,
    /// Some dependencies have not completed yet; re-queue the job.
    Blocked { unmet: Vec<JobId> },
    /// At least one dependency failed, so the job can never run.
    Abandoned { failed: Vec<JobId> },
}

/// `true` iff every dependency of `job` is in `completed`.
#[must_use]
pub fn can_run(job: &Job, completed: &HashSet<JobId>) -> bool {
    let unmet = unmet_dependencies(job, completed);
    if !unmet.is_empty() {
        trace!(job = %job.id(), ?unmet, "unmet dependencies");
    }
    unmet.is_empty()
}

/// Dependencies of `job` absent from `completed`, in dependency-list order.
#[must_use]
pub fn unmet_dependencies(job: &Job, completed: &HashSet<JobId>) -> Vec<JobId> {
    job.with_dependencies(|deps| {
        deps.iter()
            .filter(|dep| !completed.contains(*dep))
            .copied()
            .collect()
    })
}

/// Classify `job` against the completed and failed sets.
///
/// A failed dependency wins over unmet ones: waiting would never help.
#[must_use]
pub fn assess(job: &Job, completed: &HashSet<JobId>, failed: &HashSet<JobId>) -> Readiness {
    let unmet = unmet_dependencies(job, completed);
    if unmet.is_empty() {
        return Readiness::Ready;
    }
    let failed_deps: Vec<_> = unmet
        .iter()
        .filter(|dep| failed.contains(*dep))
        .copied()
        .collect();
    if failed_deps.is_empty() {
        trace!(job = %job.id(), ?unmet, "unmet dependencies");
        Readiness::Blocked { unmet }
    } else {
        Readiness::Abandoned {
            failed: failed_deps,
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use core::num::NonZeroU32;

    fn id(seq: u32) -> JobId {
        JobId::new(0, seq)
    }

    fn job(seq: u32, deps: &[u32]) -> Job {
        Job::new(
            id(seq),
            NonZeroU32::MIN,
            deps.iter().copied().map(id).collect(),
        )
        .unwrap()
    }

    fn set(seqs: &[u32]) -> HashSet<JobId> {
        seqs.iter().copied().map(id).collect()
    }

    #[test]
    fn no_dependencies_is_always_runnable() {
        let job = job(0, &[]);
        assert!(can_run(&job, &set(&[])));
        assert!(can_run(&job, &set(&[4, 5])));
    }

    #[test]
    fn requires_every_dependency() {
        let job = job(3, &[0, 1, 2]);
        assert!(!can_run(&job, &set(&[0, 2])));
        assert_eq!(unmet_dependencies(&job, &set(&[0, 2])), vec![id(1)]);
        assert!(can_run(&job, &set(&[0, 1, 2, 7])));
    }

    #[test]
    fn failed_dependency_abandons_the_job() {
        let job = job(3, &[0, 1, 2]);
        assert_eq!(
            assess(&job, &set(&[0]), &set(&[2])),
            Readiness::Abandoned {
                failed: vec![id(2)]
            }
        );
        assert_eq!(
            assess(&job, &set(&[0]), &set(&[])),
            Readiness::Blocked {
                unmet: vec![id(1), id(2)]
            }
        );
        assert_eq!(assess(&job, &set(&[0, 1, 2]), &set(&[9])), Readiness::Ready);
    }
}
