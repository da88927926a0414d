//! Producer/consumer job scheduler with dependency gating and cycle
//! resolution.
//!
//! Producers generate jobs that may depend on other jobs and push them into
//! a bounded, blocking queue. A pool of consumer threads pulls jobs from the
//! queue and executes only those whose dependencies have all completed; the
//! rest go back to the tail of the queue. Once every producer has finished,
//! the whole batch is topologically sorted once to find dependency cycles,
//! which are broken by a pluggable resolution policy so the queue can drain.
//!
//! Key modules:
//! - `job`: the `Job` unit of work and its `JobId`.
//! - `queue`: the bounded FIFO with drain (join) semantics.
//! - `gate`: the dependency predicate consulted before execution.
//! - `cycle` / `resolve`: Kahn's algorithm and the policy that breaks cycles.
//! - `producer` / `consumer`: the two worker pools.
//! - `coordinator`: runs one full scheduling pass.
//!
//! Quick start:
//! 1. Build a `SchedulerConfig` and call `Coordinator::new`.
//! 2. Optionally swap producers, the job runner or the resolution policy.
//! 3. Call `run` and read the sorted completed IDs from the `RunReport`.
//!
//! Guarantees: no job executes before all of its dependencies completed,
//! each job completes at most once, and the queue never buffers more jobs
//! than its capacity.

/// Shared record of completed and failed job IDs.
pub mod completed;
/// Run configuration and its validation.
pub mod config;
/// Consumer worker pool.
///
/// Workers fetch jobs, consult the dependency gate, execute runnable jobs
/// and re-queue blocked ones.
pub mod consumer;
/// One full scheduling pass: consumers, producers, cycle check, drain.
pub mod coordinator;
/// Cycle detection over a job batch (Kahn's topological sort).
pub mod cycle;
/// Dependency gate.
pub mod gate;
/// Jobs and job identifiers.
pub mod job;
/// Job sources and the producer pool.
///
/// Defines the `JobSource` trait, the randomized `RandomProducer`, the
/// replaying `FixedBatch`, and the `ProducerPool` that runs sources
/// concurrently on dedicated threads.
pub mod producer;
/// Bounded blocking job queue.
pub mod queue;
/// Cycle resolution policies.
pub mod resolve;
/// Job execution seam and the simulated runner.
pub mod runner;
mod sync;
/// Common aliases (fast-hash collections, shared job handle).
pub mod types;
