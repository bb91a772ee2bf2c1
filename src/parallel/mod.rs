pub mod batch;
pub mod pool;

pub use batch::{run_batch, run_batch_sequential, BatchSummary};
pub use pool::{WorkerPool, WORKERS_ENV};
