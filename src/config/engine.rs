//! Pool and mapper configuration structures.

use serde::{Deserialize, Serialize};

use crate::core::RetryPolicy;

/// Instance pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of instances to construct at startup.
    pub instances: u32,
    /// Seconds to wait for borrowed instances at shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            instances: 3,
            shutdown_grace_secs: 5,
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.instances == 0 {
            return Err("instances must be greater than 0".into());
        }
        Ok(())
    }
}

/// Bounded mapper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Maximum operations in flight per batch.
    pub max_concurrent: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get(),
        }
    }
}

impl MapperConfig {
    /// Validate mapper configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instance pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Mapper settings.
    #[serde(default)]
    pub mapper: MapperConfig,
    /// Per-item retry policy for callers that opt in.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl EngineConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.pool
            .validate()
            .map_err(|e| format!("pool invalid: {e}"))?;
        self.mapper
            .validate()
            .map_err(|e| format!("mapper invalid: {e}"))?;
        self.retry
            .validate()
            .map_err(|e| format!("retry invalid: {e}"))?;
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: EngineConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the file named by `CRAWLMAP_CONFIG`.
    ///
    /// `.env` is consulted first via dotenvy. Falls back to defaults when the
    /// variable is unset.
    pub fn load_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        match std::env::var("CRAWLMAP_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| format!("cannot read {path}: {e}"))?;
                Self::from_json_str(&raw)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(MapperConfig::default().max_concurrent >= 1);
    }

    #[test]
    fn zero_instances_rejected() {
        let cfg = PoolConfig {
            instances: 0,
            shutdown_grace_secs: 5,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_json_with_partial_sections() {
        let cfg =
            EngineConfig::from_json_str(r#"{"pool": {"instances": 8, "shutdown_grace_secs": 2}}"#)
                .unwrap();
        assert_eq!(cfg.pool.instances, 8);
        assert_eq!(cfg.retry.max_attempts, 3);
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(err.contains("parse error"));
    }

    #[test]
    fn invalid_section_reports_which() {
        let err = EngineConfig::from_json_str(r#"{"mapper": {"max_concurrent": 0}}"#).unwrap_err();
        assert!(err.contains("mapper invalid"));
    }
}
