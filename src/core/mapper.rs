//! Bounded-parallel map over a batch of work items.
//!
//! [`BoundedMapper`] applies an operation to every element of an input batch
//! with at most `max_concurrent` executions in flight, producing one
//! [`TaskResult`] per input in submission order. One item's failure never
//! cancels its siblings; partial success is a normal outcome reported through
//! the batch summary, not an error.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::MapperConfig;
use crate::core::{
    BatchReport, BatchSummary, InstancePool, MapError, MapOperation, PooledOperation, TaskId,
    TaskResult,
};

/// Applies an operation across a batch with a fixed concurrency ceiling.
///
/// The only suspension point the mapper itself introduces is acquiring a
/// concurrency permit; operations may suspend further (typically on
/// [`InstancePool::acquire`]).
#[derive(Debug, Clone)]
pub struct BoundedMapper {
    max_concurrent: usize,
}

impl BoundedMapper {
    /// Create a mapper from validated configuration.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidConcurrency`] if `max_concurrent` is zero.
    pub fn new(config: &MapperConfig) -> Result<Self, MapError> {
        Self::with_concurrency(config.max_concurrent)
    }

    /// Create a mapper with an explicit concurrency ceiling.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidConcurrency`] if `max_concurrent` is zero.
    pub fn with_concurrency(max_concurrent: usize) -> Result<Self, MapError> {
        if max_concurrent == 0 {
            return Err(MapError::InvalidConcurrency);
        }
        Ok(Self { max_concurrent })
    }

    /// The configured concurrency ceiling.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Apply `op` to every input with at most `max_concurrent` in flight.
    ///
    /// Returns one result per input, index-aligned with the batch regardless
    /// of completion order. Operation errors and panics are captured as failed
    /// results. An empty batch returns an empty report immediately without
    /// taking any permit.
    pub async fn map<I, T, O>(
        &self,
        op: Arc<O>,
        inputs: Vec<I>,
    ) -> Result<BatchReport<T>, MapError>
    where
        I: Send + 'static,
        T: Send + 'static,
        O: MapOperation<I, T>,
    {
        self.run_batch(inputs, move |id, input| {
            let op = Arc::clone(&op);
            async move {
                let started = Instant::now();
                match op.run(input).await {
                    Ok(value) => TaskResult::succeeded(id, value, started.elapsed()),
                    Err(e) => {
                        debug!(task = id, error = %e, "task failed");
                        TaskResult::failed(id, format!("{e:#}"), started.elapsed())
                    }
                }
            }
        })
        .await
    }

    /// Like [`map`](Self::map), but each task borrows an instance from `pool`
    /// for the duration of its operation.
    ///
    /// The instance is returned on every exit path, including operation errors
    /// and panics, so a failing batch cannot leak pool capacity.
    ///
    /// # Errors
    ///
    /// [`MapError::NoCapacity`] if the pool has zero healthy instances; the
    /// batch fails fast instead of parking forever.
    pub async fn map_with_pool<R, I, T, O>(
        &self,
        pool: &Arc<InstancePool<R>>,
        op: Arc<O>,
        inputs: Vec<I>,
    ) -> Result<BatchReport<T>, MapError>
    where
        R: Send + Sync + 'static,
        I: Send + 'static,
        T: Send + 'static,
        O: PooledOperation<R, I, T>,
    {
        if inputs.is_empty() {
            return Ok(BatchReport::empty(Uuid::new_v4()));
        }
        if pool.capacity() == 0 {
            return Err(MapError::NoCapacity);
        }

        let pool = Arc::clone(pool);
        self.run_batch(inputs, move |id, input| {
            let op = Arc::clone(&op);
            let pool = Arc::clone(&pool);
            async move {
                let instance = match pool.acquire().await {
                    Ok(instance) => instance,
                    Err(e) => {
                        debug!(task = id, error = %e, "instance unavailable");
                        return TaskResult::failed(
                            id,
                            format!("instance unavailable: {e}"),
                            std::time::Duration::ZERO,
                        );
                    }
                };
                let started = Instant::now();
                let result = match op.run(&instance, input).await {
                    Ok(value) => TaskResult::succeeded(id, value, started.elapsed()),
                    Err(e) => {
                        debug!(task = id, instance_id = instance.id(), error = %e, "task failed");
                        TaskResult::failed(id, format!("{e:#}"), started.elapsed())
                    }
                };
                // Guard drops here, returning the instance before the permit.
                result
            }
        })
        .await
    }

    /// Shared batch driver: spawn every item behind the semaphore, then join
    /// handles in submission order to reassemble index-aligned results.
    async fn run_batch<I, T, F, Fut>(
        &self,
        inputs: Vec<I>,
        run_one: F,
    ) -> Result<BatchReport<T>, MapError>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(TaskId, I) -> Fut,
        Fut: std::future::Future<Output = TaskResult<T>> + Send + 'static,
    {
        let batch_id = Uuid::new_v4();
        if inputs.is_empty() {
            return Ok(BatchReport::empty(batch_id));
        }

        let submitted = inputs.len();
        let started = Instant::now();
        let started_at_ms = crate::util::clock::now_ms();
        info!(
            %batch_id,
            tasks = submitted,
            max_concurrent = self.max_concurrent,
            "map batch started"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(submitted);
        for (index, input) in inputs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let fut = run_one(index as TaskId, input);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed while the batch runs.
                let _permit = semaphore.acquire_owned().await.ok();
                fut.await
            }));
        }

        let mut results = Vec::with_capacity(submitted);
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    // Panic inside the operation; the permit and any borrowed
                    // instance were released during unwind.
                    error!(task = index, error = %e, "map task aborted");
                    TaskResult::failed(
                        index as TaskId,
                        format!("task aborted: {e}"),
                        std::time::Duration::ZERO,
                    )
                }
            };
            results.push(result);
        }

        let summary = BatchSummary::from_results(&results, started.elapsed());
        info!(
            %batch_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "map batch complete"
        );
        Ok(BatchReport {
            batch_id,
            started_at_ms,
            results,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_concurrency_is_rejected() {
        assert_eq!(
            BoundedMapper::with_concurrency(0).unwrap_err(),
            MapError::InvalidConcurrency
        );
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let mapper = BoundedMapper::with_concurrency(4).unwrap();
        let op = Arc::new(|n: u32| async move { Ok(n) });
        let report = mapper.map(op, Vec::new()).await.unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.summary.submitted, 0);
    }

    #[tokio::test]
    async fn results_are_index_aligned() {
        let mapper = BoundedMapper::with_concurrency(3).unwrap();
        // Later items finish first; results must still come back in order.
        let op = Arc::new(|n: u64| async move {
            tokio::time::sleep(Duration::from_millis(50 - n * 5)).await;
            Ok(n * 10)
        });
        let report = mapper.map(op, (0..8).collect()).await.unwrap();
        assert_eq!(report.results.len(), 8);
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.id, i as TaskId);
            assert_eq!(result.value(), Some(&(i as u64 * 10)));
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_ceiling() {
        let mapper = BoundedMapper::with_concurrency(2).unwrap();
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let op = {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            Arc::new(move |n: u32| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let now = current.fetch_add(1, Ordering::AcqRel) + 1;
                    peak.fetch_max(now, Ordering::AcqRel);
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    current.fetch_sub(1, Ordering::AcqRel);
                    Ok(n)
                }
            })
        };
        let report = mapper.map(op, (0..10).collect()).await.unwrap();
        assert_eq!(report.summary.succeeded, 10);
        assert!(peak.load(Ordering::Acquire) <= 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let mapper = BoundedMapper::with_concurrency(4).unwrap();
        let op = Arc::new(|n: u32| async move {
            if n == 2 {
                anyhow::bail!("parse error on record {n}");
            }
            Ok(n)
        });
        let report = mapper.map(op, (0..5).collect()).await.unwrap();
        assert_eq!(report.summary.succeeded, 4);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.results[2].success());
        assert!(report.results[2].error().unwrap().contains("parse error"));
    }

    #[tokio::test]
    async fn all_failures_do_not_raise() {
        let mapper = BoundedMapper::with_concurrency(2).unwrap();
        let op = Arc::new(|_n: u32| async move {
            Err::<u32, _>(anyhow::anyhow!("always down"))
        });
        let report = mapper.map(op, (0..6).collect()).await.unwrap();
        assert_eq!(report.summary.failed, 6);
        assert_eq!(report.summary.succeeded, 0);
    }

    #[tokio::test]
    async fn panics_become_failed_results() {
        let mapper = BoundedMapper::with_concurrency(2).unwrap();
        let op = Arc::new(|n: u32| async move {
            if n == 1 {
                panic!("selector crashed");
            }
            Ok(n)
        });
        let report = mapper.map(op, (0..3).collect()).await.unwrap();
        assert_eq!(report.summary.failed, 1);
        assert!(report.results[1].error().unwrap().contains("aborted"));
        assert!(report.results[0].success());
        assert!(report.results[2].success());
    }
}
