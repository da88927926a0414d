use crate::{
    job::JobId,
    types::{IndexSet, SharedJob},
};
use core::fmt::Debug;
use tracing::info;

/// Strategy for breaking the cycles reported by [`crate::cycle::analyze`].
///
/// After `resolve` returns, re-analyzing the returned jobs must report no
/// deadlocked job. The coordinator checks this once and treats a violation
/// as a fatal internal error.
pub trait ResolutionPolicy: Debug + Send + Sync {
    /// Mutate the jobs named in `deadlocked` so the batch becomes acyclic.
    fn resolve(&self, deadlocked: &IndexSet<JobId>, jobs: Vec<SharedJob>) -> Vec<SharedJob>;
}

/// Clears the whole dependency list of every deadlocked job.
///
/// Blunt: it does not look for the minimal set of edges to drop, so all
/// ordering constraints of the implicated jobs are lost.
#[derive(Debug, Default, Copy, Clone)]
pub struct ClearDependencies;

impl ResolutionPolicy for ClearDependencies {
    fn resolve(&self, deadlocked: &IndexSet<JobId>, jobs: Vec<SharedJob>) -> Vec<SharedJob> {
        if deadlocked.is_empty() {
            return jobs;
        }
        for job in jobs.iter().filter(|job| deadlocked.contains(&job.id())) {
            let removed = job.clear_dependencies();
            info!(job = %job.id(), ?removed, "dependencies removed to resolve deadlock");
        }
        jobs
    }
}
