//! Builders to construct an engine context from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::EngineConfig;
use crate::core::{BoundedMapper, InstanceFactory, InstancePool, RetryPolicy};

/// Explicitly constructed bundle of pool, mapper, and retry policy.
///
/// Passed to pipeline stages at creation time instead of process-wide
/// singletons; dropping the context after [`shutdown`](Self::shutdown) tears
/// everything down.
pub struct EngineContext<R>
where
    R: Send + Sync + 'static,
{
    /// Shared instance pool.
    pub pool: Arc<InstancePool<R>>,
    /// Batch mapper configured from the engine config.
    pub mapper: BoundedMapper,
    /// Per-item retry policy for callers that opt in.
    pub retry: RetryPolicy,
    shutdown_grace: Duration,
}

impl<R> EngineContext<R>
where
    R: Send + Sync + 'static,
{
    /// Shut down the pool with the configured grace period.
    pub async fn shutdown(&self) {
        self.pool.shutdown(self.shutdown_grace).await;
    }
}

impl<R> std::fmt::Debug for EngineContext<R>
where
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("pool", &self.pool)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

/// Build an [`EngineContext`] from validated configuration and a factory.
///
/// Instance construction failures shrink the pool rather than failing the
/// build; a zero-capacity pool surfaces later as a fast `NoCapacity` error
/// from the mapper.
///
/// # Errors
///
/// Fails on invalid configuration.
pub async fn build_engine<R, F>(
    cfg: &EngineConfig,
    factory: Arc<F>,
) -> anyhow::Result<EngineContext<R>>
where
    R: Send + Sync + 'static,
    F: InstanceFactory<R>,
{
    cfg.validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("engine config invalid")?;

    let mapper = BoundedMapper::new(&cfg.mapper).context("mapper config invalid")?;
    let pool = InstancePool::initialize(cfg.pool.instances, factory).await;

    Ok(EngineContext {
        pool,
        mapper,
        retry: cfg.retry,
        shutdown_grace: Duration::from_secs(cfg.pool.shutdown_grace_secs),
    })
}
