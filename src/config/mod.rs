//! Configuration models for the pool, mapper, and retry policy.

pub mod engine;

pub use engine::{EngineConfig, MapperConfig, PoolConfig};
