//! Capability seams for external collaborators.
//!
//! Scoring providers and storage sinks are injected behind these traits so the
//! mapping core can be exercised with fakes. Real implementations (model
//! endpoints, warehouse writers) live outside this crate; the in-memory
//! implementations here back tests and local development.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

/// Scores a crawled lead record.
#[async_trait]
pub trait AnalysisProvider: Send + Sync + 'static {
    /// Return a score in `[0.0, 1.0]` for the record.
    async fn score(&self, record: &Value) -> anyhow::Result<f64>;
}

/// Persists a batch of crawled records.
#[async_trait]
pub trait StorageSink: Send + Sync + 'static {
    /// Persist the records, returning how many were written.
    async fn persist(&self, records: &[Value]) -> anyhow::Result<usize>;
}

/// Analysis provider returning a fixed score, for tests and dry runs.
#[derive(Debug, Clone, Copy)]
pub struct MockAnalysisProvider {
    score: f64,
}

impl MockAnalysisProvider {
    /// Create a provider that scores every record with `score`.
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

#[async_trait]
impl AnalysisProvider for MockAnalysisProvider {
    async fn score(&self, _record: &Value) -> anyhow::Result<f64> {
        Ok(self.score)
    }
}

/// Storage sink that appends records to an in-process buffer.
#[derive(Debug, Default)]
pub struct MemoryStorageSink {
    records: Mutex<Vec<Value>>,
}

impl MemoryStorageSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far.
    pub fn records(&self) -> Vec<Value> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl StorageSink for MemoryStorageSink {
    async fn persist(&self, records: &[Value]) -> anyhow::Result<usize> {
        let mut stored = self.records.lock();
        stored.extend_from_slice(records);
        debug!(written = records.len(), total = stored.len(), "records persisted");
        Ok(records.len())
    }
}
