//! Error types for pool and mapper operations.

use thiserror::Error;

/// Errors produced by the instance pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Every instance construction failed; the pool cannot lend anything.
    #[error("pool has no healthy instances")]
    NoCapacity,
    /// The pool has been shut down; pending and future acquires are rejected.
    #[error("pool has been shut down")]
    PoolShutdown,
}

/// Errors produced by the bounded mapper's entry points.
///
/// Per-item operation failures are never surfaced here; they are captured in
/// the corresponding [`TaskResult`](crate::core::TaskResult). Only systemic
/// conditions (invalid arguments, zero capacity) reject the whole batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// `max_concurrent` must be at least 1.
    #[error("max_concurrent must be at least 1")]
    InvalidConcurrency,
    /// The backing instance pool has zero healthy instances.
    #[error("instance pool has no capacity")]
    NoCapacity,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
