mod pool;
mod worker;

pub use pool::{DrainReport, WorkerHandles, WorkerPool};
pub use worker::{Outcome, Worker};
