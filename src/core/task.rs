//! Task lifecycle types and batch result aggregation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a task within one batch, derived from its input position.
pub type TaskId = u64;

/// Lifecycle state of a mapped task.
///
/// Tasks move `Pending -> Running -> {Succeeded, Failed}`. There is no retry
/// state at this layer; retry policy belongs to the caller (see
/// [`RetryPolicy`](crate::core::RetryPolicy)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting for a concurrency slot.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
}

/// Terminal outcome of one mapped task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskOutcome<T> {
    /// The operation produced a value.
    Succeeded(T),
    /// The operation failed with a rendered error chain.
    Failed(String),
}

/// Result record for one work item. Immutable once produced; exactly one is
/// emitted per input, index-aligned with the submitted batch regardless of
/// completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize"))]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct TaskResult<T> {
    /// Batch-positional task identifier.
    pub id: TaskId,
    /// Success value or captured error.
    pub outcome: TaskOutcome<T>,
    /// Wall-clock execution time of the operation in milliseconds.
    pub duration_ms: u64,
}

impl<T> TaskResult<T> {
    /// Build a successful result.
    pub fn succeeded(id: TaskId, value: T, duration: Duration) -> Self {
        Self {
            id,
            outcome: TaskOutcome::Succeeded(value),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Build a failed result from a rendered error.
    pub fn failed(id: TaskId, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            id,
            outcome: TaskOutcome::Failed(error.into()),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Whether the task succeeded.
    pub fn success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded(_))
    }

    /// Terminal state of the task.
    pub fn state(&self) -> TaskState {
        if self.success() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        }
    }

    /// The success value, if any.
    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            TaskOutcome::Succeeded(v) => Some(v),
            TaskOutcome::Failed(_) => None,
        }
    }

    /// The captured error, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Succeeded(_) => None,
            TaskOutcome::Failed(e) => Some(e),
        }
    }
}

/// Aggregate counts for one mapped batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of work items submitted.
    pub submitted: usize,
    /// Number of items that succeeded.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Wall-clock time for the whole batch in milliseconds.
    pub elapsed_ms: u64,
}

impl BatchSummary {
    /// Compute a summary from finished results.
    pub fn from_results<T>(results: &[TaskResult<T>], elapsed: Duration) -> Self {
        let succeeded = results.iter().filter(|r| r.success()).count();
        Self {
            submitted: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Ordered results plus aggregate counts for one `map` invocation.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Unique identifier for this batch, used in log correlation.
    pub batch_id: Uuid,
    /// Submission time, milliseconds since the Unix epoch.
    pub started_at_ms: u128,
    /// One result per input, in submission order.
    pub results: Vec<TaskResult<T>>,
    /// Aggregate counts.
    pub summary: BatchSummary,
}

impl<T> BatchReport<T> {
    /// An empty report for a zero-item batch.
    pub fn empty(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            started_at_ms: crate::util::clock::now_ms(),
            results: Vec::new(),
            summary: BatchSummary::default(),
        }
    }
}
