//! Bounded per-item retry with exponential backoff.
//!
//! Retry applies to a single failed unit of work, never to a whole batch: a
//! caller that wants retries wraps the item operation with a policy and maps
//! the wrapped operation. The mapper itself never retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::MapOperation;

/// Bounded exponential backoff policy for one unit of work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Validate policy values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }
        if self.multiplier == 0 {
            return Err("multiplier must be at least 1".into());
        }
        Ok(())
    }

    /// Run `op` on `input`, retrying on failure up to the attempt budget.
    ///
    /// The input is cloned per attempt; backoff sleeps between attempts grow
    /// by `multiplier`. The last error is returned with attempt context once
    /// the budget is exhausted.
    pub async fn run<I, T, O>(&self, op: &Arc<O>, input: I) -> anyhow::Result<T>
    where
        I: Clone + Send + 'static,
        T: Send + 'static,
        O: MapOperation<I, T>,
    {
        let mut backoff = Duration::from_millis(self.initial_backoff_ms);
        let mut attempt = 1u32;
        loop {
            match op.run(input.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts.max(1) => {
                    return Err(e).with_context(|| format!("failed after {attempt} attempts"));
                }
                Err(e) => {
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "attempt failed; backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= self.multiplier;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(succeed_on: u32) -> (Arc<AtomicU32>, Arc<impl MapOperation<u32, u32>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let op = {
            let calls = Arc::clone(&calls);
            Arc::new(move |n: u32| {
                let calls = Arc::clone(&calls);
                async move {
                    let call = calls.fetch_add(1, Ordering::AcqRel) + 1;
                    if call < succeed_on {
                        anyhow::bail!("transient failure on call {call}");
                    }
                    Ok(n)
                }
            })
        };
        (calls, op)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::default();
        let (calls, op) = flaky(3);
        let value = policy.run(&op, 9).await.unwrap();
        assert_eq!(value, 9);
        assert_eq!(calls.load(Ordering::Acquire), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempt_budget() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff_ms: 10,
            multiplier: 2,
        };
        let (calls, op) = flaky(u32::MAX);
        let err = policy.run(&op, 1).await.unwrap_err();
        assert_eq!(calls.load(Ordering::Acquire), 2);
        assert!(format!("{err:#}").contains("failed after 2 attempts"));
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
