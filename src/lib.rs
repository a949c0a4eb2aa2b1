//! # Crawlmap
//!
//! Bounded-concurrency task mapping over a fixed pool of reusable crawl
//! instances.
//!
//! This library is the concurrency core of a lead-generation crawl engine: it
//! applies an operation across a batch of work items with a hard ceiling on
//! how many run at once, lending each operation exclusive access to an
//! expensive reusable instance (a browser session, an API client) from a
//! fixed-size pool.
//!
//! ## Core Problem Solved
//!
//! Crawl workloads burn expensive, stateful resources:
//!
//! - **Browser sessions are costly**: launching one takes seconds and real
//!   memory, so a fixed set must be reused across thousands of targets
//! - **Targets fail independently**: one dead site must never abort the rest
//!   of the batch, and partial success is the normal outcome
//! - **Leaked borrows deadlock**: an instance not returned after a failure
//!   permanently shrinks effective capacity under sustained load
//!
//! ## Key Features
//!
//! - **Bounded Mapper**: semaphore-enforced concurrency ceiling, one result
//!   per input in submission order, failures captured per item
//! - **Instance Pool**: fixed set constructed at startup, independent
//!   construction failures shrink capacity instead of crashing, RAII borrows
//!   that come home on every exit path including panics
//! - **Fail-fast on zero capacity**: a pool with no healthy instances rejects
//!   batches instead of hanging forever
//! - **Per-item retry**: bounded exponential backoff applied to the failed
//!   unit only, never the whole batch
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crawlmap::builders::build_engine;
//! use crawlmap::config::EngineConfig;
//!
//! let ctx = build_engine(&EngineConfig::default(), Arc::new(SessionFactory)).await?;
//! let report = ctx.mapper.map_with_pool(&ctx.pool, Arc::new(ScrapeTarget), urls).await?;
//! println!("{}/{} targets succeeded", report.summary.succeeded, report.summary.submitted);
//! ctx.shutdown().await;
//! ```
//!
//! For complete examples, see `tests/mapper_pool_test.rs`.

/// Core mapping and pooling abstractions.
pub mod core;
/// Configuration models for the pool, mapper, and retry policy.
pub mod config;
/// Builders to construct engine components from configuration.
pub mod builders;
/// Capability seams for external collaborators (scoring, storage).
pub mod capability;
/// Shared utilities.
pub mod util;
