//! Fixed-size pool of reusable crawl instances.
//!
//! The pool owns a fixed set of expensive resources (browser sessions, API
//! clients) constructed once at startup. Borrows are exclusive and short-lived:
//! [`InstancePool::acquire`] suspends until an instance is free, and the
//! returned [`PooledInstance`] guard hands the instance back on drop, on every
//! exit path. Skipping the return on error would deadlock the pool under
//! sustained load, so the guard is the only way to hold an instance.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::core::PoolError;

/// Identifier of one pooled instance, assigned at construction.
pub type InstanceId = u32;

/// Factory for constructing and tearing down pooled instances.
///
/// Construction of each instance may fail independently; failed instances are
/// logged and excluded from the pool without failing initialization.
#[async_trait]
pub trait InstanceFactory<R>: Send + Sync + 'static
where
    R: Send + Sync + 'static,
{
    /// Construct the instance with the given identifier.
    async fn create(&self, id: InstanceId) -> anyhow::Result<R>;

    /// Tear down an instance at pool shutdown. Errors are logged and swallowed
    /// by the pool; they never block shutdown completion.
    async fn teardown(&self, id: InstanceId, instance: R) -> anyhow::Result<()> {
        drop(instance);
        debug!(instance_id = id, "instance dropped");
        Ok(())
    }
}

struct Slot<R> {
    id: InstanceId,
    resource: R,
}

/// Internal counters for pool statistics (lock-free atomics).
#[derive(Debug, Default)]
struct PoolCounters {
    in_use: AtomicU32,
    peak_in_use: AtomicU32,
    total_acquires: AtomicU64,
    construction_failures: AtomicU32,
}

/// Snapshot of pool utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances requested at initialization.
    pub total_requested: u32,
    /// Instances that constructed successfully and belong to the pool.
    pub healthy: u32,
    /// Instances currently free.
    pub available: u32,
    /// Instances currently borrowed.
    pub in_use: u32,
    /// High-water mark of concurrently borrowed instances.
    pub peak_in_use: u32,
    /// Total successful acquires over the pool's lifetime.
    pub total_acquires: u64,
    /// Instance constructions that failed at initialization.
    pub construction_failures: u32,
}

/// Fixed-size pool lending exclusive access to reusable instances.
///
/// The available set is the only concurrently mutated state: a
/// `parking_lot::Mutex<VecDeque>` guarded by a tokio [`Semaphore`] whose permit
/// count equals the healthy instance count. Acquire order is FIFO-ish (tokio's
/// semaphore queues waiters fairly); strict FIFO is not guaranteed.
pub struct InstancePool<R>
where
    R: Send + Sync + 'static,
{
    available: Mutex<VecDeque<Slot<R>>>,
    permits: Arc<Semaphore>,
    factory: Arc<dyn InstanceFactory<R>>,
    total_requested: u32,
    healthy: u32,
    counters: PoolCounters,
    shutdown: AtomicBool,
    /// Signaled on every instance return while shutdown is draining.
    returned: Notify,
}

impl<R> InstancePool<R>
where
    R: Send + Sync + 'static,
{
    /// Construct `n` instances concurrently and collect the healthy ones.
    ///
    /// Each construction may fail independently; failures are logged and the
    /// instance is excluded. A pool where every construction failed is still
    /// returned (with zero capacity) so the caller can decide whether to
    /// proceed; [`acquire`](Self::acquire) on such a pool fails fast instead
    /// of hanging.
    pub async fn initialize<F>(n: u32, factory: Arc<F>) -> Arc<Self>
    where
        F: InstanceFactory<R>,
    {
        info!(instances = n, "initializing instance pool");

        let factory: Arc<dyn InstanceFactory<R>> = factory;
        let mut set = tokio::task::JoinSet::new();
        for id in 0..n {
            let factory = Arc::clone(&factory);
            set.spawn(async move { (id, factory.create(id).await) });
        }

        let mut slots: Vec<Slot<R>> = Vec::with_capacity(n as usize);
        let mut failures = 0u32;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, Ok(resource))) => slots.push(Slot { id, resource }),
                Ok((id, Err(e))) => {
                    failures += 1;
                    warn!(instance_id = id, error = %e, "instance construction failed; excluded from pool");
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, "instance construction task panicked; excluded from pool");
                }
            }
        }

        // Deterministic initial lending order regardless of construction timing.
        slots.sort_by_key(|s| s.id);
        let healthy = slots.len() as u32;
        if healthy == 0 {
            warn!(requested = n, "all instance constructions failed; pool has zero capacity");
        } else {
            info!(healthy, failures, "instance pool ready");
        }

        let counters = PoolCounters::default();
        counters
            .construction_failures
            .store(failures, Ordering::Relaxed);

        Arc::new(Self {
            available: Mutex::new(slots.into_iter().collect()),
            permits: Arc::new(Semaphore::new(healthy as usize)),
            factory,
            total_requested: n,
            healthy,
            counters,
            shutdown: AtomicBool::new(false),
            returned: Notify::new(),
        })
    }

    /// Number of healthy instances the pool can lend.
    pub fn capacity(&self) -> u32 {
        self.healthy
    }

    /// Borrow an instance, suspending until one is free.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NoCapacity`] if every construction failed at startup.
    /// - [`PoolError::PoolShutdown`] if the pool has been shut down, including
    ///   waiters pending at the moment of shutdown.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledInstance<R>, PoolError> {
        if self.healthy == 0 {
            return Err(PoolError::NoCapacity);
        }

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::PoolShutdown)?;

        // A held permit means a slot is free, unless shutdown drained the set
        // between permit grant and this lock.
        let slot = match self.available.lock().pop_front() {
            Some(slot) => slot,
            None => return Err(PoolError::PoolShutdown),
        };

        let in_use = self.counters.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak_in_use.fetch_max(in_use, Ordering::AcqRel);
        self.counters.total_acquires.fetch_add(1, Ordering::Relaxed);
        debug!(instance_id = slot.id, in_use, "instance acquired");

        Ok(PooledInstance {
            slot: Some(slot),
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Snapshot current utilization.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_requested: self.total_requested,
            healthy: self.healthy,
            available: self.available.lock().len() as u32,
            in_use: self.counters.in_use.load(Ordering::Acquire),
            peak_in_use: self.counters.peak_in_use.load(Ordering::Acquire),
            total_acquires: self.counters.total_acquires.load(Ordering::Relaxed),
            construction_failures: self.counters.construction_failures.load(Ordering::Relaxed),
        }
    }

    /// Shut the pool down.
    ///
    /// Pending and future acquires fail immediately with
    /// [`PoolError::PoolShutdown`]. Borrowed instances get up to `grace` to
    /// come home; anything still outstanding after that is abandoned (the
    /// resource is dropped when its guard drops, without a factory teardown).
    /// Every instance in the available set is torn down via the factory, with
    /// teardown errors logged and swallowed.
    pub async fn shutdown(&self, grace: Duration) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down instance pool");

        // Reject pending and future acquires.
        self.permits.close();

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let outstanding = self.counters.in_use.load(Ordering::Acquire);
            if outstanding == 0 {
                break;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                warn!(outstanding, "shutdown grace elapsed; abandoning borrowed instances");
                break;
            }
            // Guards notify on return while the shutdown flag is set.
            let _ = tokio::time::timeout(deadline - now, self.returned.notified()).await;
        }

        let slots: Vec<Slot<R>> = {
            let mut available = self.available.lock();
            available.drain(..).collect()
        };
        let torn_down = slots.len();
        for slot in slots {
            if let Err(e) = self.factory.teardown(slot.id, slot.resource).await {
                warn!(instance_id = slot.id, error = %e, "instance teardown failed");
            }
        }
        info!(torn_down, "instance pool shut down");
    }
}

impl<R> std::fmt::Debug for InstancePool<R>
where
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePool")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Exclusive borrow of one pooled instance.
///
/// Dropping the guard returns the instance to the available set and releases
/// the concurrency permit, waking the next waiter. The instance is never
/// destroyed mid-run; it goes back to the pool even if the borrowing operation
/// failed or panicked.
pub struct PooledInstance<R>
where
    R: Send + Sync + 'static,
{
    slot: Option<Slot<R>>,
    pool: Arc<InstancePool<R>>,
    _permit: OwnedSemaphorePermit,
}

impl<R> std::fmt::Debug for PooledInstance<R>
where
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledInstance")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

impl<R> PooledInstance<R>
where
    R: Send + Sync + 'static,
{
    /// Identifier of the borrowed instance.
    pub fn id(&self) -> InstanceId {
        // Invariant: the slot is present until drop.
        self.slot.as_ref().expect("slot present until drop").id
    }
}

impl<R> Deref for PooledInstance<R>
where
    R: Send + Sync + 'static,
{
    type Target = R;

    fn deref(&self) -> &R {
        // Invariant: the slot is present until drop.
        &self.slot.as_ref().expect("slot present until drop").resource
    }
}

impl<R> Drop for PooledInstance<R>
where
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let id = slot.id;
            self.pool.available.lock().push_back(slot);
            self.pool.counters.in_use.fetch_sub(1, Ordering::AcqRel);
            debug!(instance_id = id, "instance returned");
            if self.pool.shutdown.load(Ordering::Acquire) {
                self.pool.returned.notify_waiters();
            }
        }
        // The permit drops after the slot is back, so a woken waiter always
        // finds a free instance.
    }
}
