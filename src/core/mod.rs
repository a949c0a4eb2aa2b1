//! Core mapping and pooling abstractions.

pub mod error;
pub mod instance_pool;
pub mod mapper;
pub mod operation;
pub mod retry;
pub mod task;

pub use error::{AppResult, MapError, PoolError};
pub use instance_pool::{InstanceFactory, InstanceId, InstancePool, PoolStats, PooledInstance};
pub use mapper::BoundedMapper;
pub use operation::{MapOperation, PooledOperation};
pub use retry::RetryPolicy;
pub use task::{BatchReport, BatchSummary, TaskId, TaskOutcome, TaskResult, TaskState};
