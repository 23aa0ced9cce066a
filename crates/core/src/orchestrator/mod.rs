//! Bounded-concurrency fan-out of per-article transforms.
//!
//! All tasks of a run are spawned at once; a process-wide semaphore limits
//! how many hold an external call at any moment. Each task reports exactly
//! one [`ProcessingResult`] over a channel and bumps the run's progress in
//! the [`RunRegistry`](crate::run::RunRegistry).

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::Orchestrator;
pub use types::ProcessingResult;
