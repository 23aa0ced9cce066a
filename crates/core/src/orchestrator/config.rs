//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the run orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum external calls in flight, shared by all runs in the process.
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,

    /// How long a finished run's status and document are kept (seconds).
    #[serde(default = "default_status_ttl")]
    pub status_ttl_secs: u64,

    /// How often expired runs are swept (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_max_parallel_tasks() -> usize {
    20
}

fn default_status_ttl() -> u64 {
    3600 // 1 hour
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: default_max_parallel_tasks(),
            status_ttl_secs: default_status_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}
