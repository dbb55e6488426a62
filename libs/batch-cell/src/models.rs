use std::time::Duration;

use serde::{Deserialize, Serialize};

use shared_config::AppConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub pool_id: String,
    pub worker_count: usize,
    pub graceful_shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_id: "batch".to_string(),
            worker_count: shared_config::DEFAULT_BATCH_WORKERS,
            graceful_shutdown_timeout: Duration::from_secs(
                shared_config::DEFAULT_BATCH_SHUTDOWN_GRACE_SECONDS,
            ),
        }
    }
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            worker_count: config.batch_workers.max(1),
            graceful_shutdown_timeout: config.batch_shutdown_grace(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStats {
    pub worker_count: usize,
    pub in_flight: usize,
    pub completed: u64,
    pub panicked: u64,
    pub accepting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShutdownReport {
    /// All queued and running tasks finished inside the grace period.
    pub drained: bool,
    /// Workers still busy when the grace period ran out.
    pub aborted_workers: usize,
}
