use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch pool {pool_id} is shut down and no longer accepts work")]
    PoolShutdown { pool_id: String },

    #[error("Batch task was lost before producing a result (panicked or aborted)")]
    TaskLost,
}
