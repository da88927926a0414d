use crate::{
    job::JobId,
    types::{HashMap, IndexMap, IndexSet, SharedJob},
};
use rustc_hash::FxBuildHasher;
use std::collections::VecDeque;
use tracing::debug;

/// Outcome of running Kahn's algorithm over a job batch.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleAnalysis {
    /// Jobs that could be ordered, dependencies before dependents.
    ///
    /// Ties between jobs that become ready together are broken by batch
    /// order, but callers should not rely on it.
    pub order: Vec<JobId>,
    /// Jobs whose in-degree never reached zero: members of a cycle, jobs
    /// downstream of one, or jobs depending on an ID missing from the batch.
    pub deadlocked: IndexSet<JobId>,
}

impl CycleAnalysis {
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.deadlocked.is_empty()
    }
}

/// Topologically sort `jobs` and report every job that cannot be ordered.
///
/// Job IDs must be unique within `jobs`.
///
/// # Panics
/// In case of internal invariant violations. Impossible if there are no
/// bugs in the code.
pub fn analyze(jobs: &[SharedJob]) -> CycleAnalysis {
    // Example:
    //
    //   A     B <-- D
    //    \   /     ^
    //      C ------'
    //      |
    //      E
    //
    // Edges point from a dependency to its dependent. A is a root, B, C and D
    // form a cycle, E sits behind it. Kahn's algorithm places A only; B, C, D
    // and E keep a positive in-degree and are reported.
    //
    // Phase 1: count each job's incoming edges and index dependents by the
    // job they wait on. Dependency lists are snapshotted once per job so a
    // concurrent resolution cannot tear the view.
    let mut in_degree = IndexMap::with_capacity_and_hasher(jobs.len(), FxBuildHasher);
    let mut dependents: HashMap<JobId, Vec<JobId>> =
        HashMap::with_capacity_and_hasher(jobs.len(), FxBuildHasher);
    for job in jobs {
        let id = job.id();
        job.with_dependencies(|deps| {
            *in_degree.entry(id).or_insert(0usize) += deps.len();
            for &dep in deps {
                dependents.entry(dep).or_default().push(id);
            }
        });
    }

    // Phase 2: seed the ready queue with independent jobs.
    let mut ready: VecDeque<_> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();

    // Phase 3: repeatedly place a ready job and release its dependents.
    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(id) = ready.pop_front() {
        order.push(id);
        let Some(children) = dependents.get(&id) else {
            continue;
        };
        for child in children {
            let degree = in_degree.get_mut(child).expect("analyze: [1]");
            *degree = degree.checked_sub(1).expect("analyze: [2]");
            if *degree == 0 {
                ready.push_back(*child);
            }
        }
    }

    // Phase 4: whatever was never placed is stuck.
    let deadlocked: IndexSet<_> = in_degree
        .into_iter()
        .filter(|&(_, degree)| degree > 0)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(
        order.len() + deadlocked.len(),
        jobs.len(),
        "analyze: [3]"
    );
    debug!(
        jobs = jobs.len(),
        ordered = order.len(),
        deadlocked = deadlocked.len(),
        "cycle analysis finished"
    );
    CycleAnalysis { order, deadlocked }
}

/// IDs of jobs that can never run because of a dependency cycle. Empty iff
/// the batch is acyclic.
#[must_use]
pub fn find_deadlocked(jobs: &[SharedJob]) -> IndexSet<JobId> {
    analyze(jobs).deadlocked
}
