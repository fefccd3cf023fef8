use crate::{
    error::{LivesError, LivesResult},
    reconcile::validate_refill_period,
    types::{Lives, Seconds},
};
use serde::{Deserialize, Serialize};

/// Static settings for the lives pool. Supplied once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Capacity of a fresh pool.
    pub max_count: Lives,
    /// Seconds to restore one life.
    pub refill_period_seconds: Seconds,
    /// Opaque asset reference for the lives icon.
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LivesConfigFile {
    lives: PoolConfig,
}

impl PoolConfig {
    /// Load from the data/ directory.
    /// In tests, use PoolConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/lives/lives_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: LivesConfigFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        file.lives.validate()?;
        log::debug!(
            "lives config loaded from {path}: max={} period={}s",
            file.lives.max_count,
            file.lives.refill_period_seconds
        );
        Ok(file.lives)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            max_count: 5,
            refill_period_seconds: 600.0,
            icon: "ui/icons/lives".into(),
        }
    }

    pub fn validate(&self) -> LivesResult<()> {
        if self.max_count == 0 {
            return Err(LivesError::InvalidMaxCount { max_count: self.max_count });
        }
        validate_refill_period(self.refill_period_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        PoolConfig::default_test().validate().unwrap();
    }

    #[test]
    fn zero_period_and_zero_max_are_rejected() {
        let mut cfg = PoolConfig::default_test();
        cfg.refill_period_seconds = 0.0;
        assert!(matches!(cfg.validate(), Err(LivesError::InvalidRefillPeriod { .. })));

        let mut cfg = PoolConfig::default_test();
        cfg.max_count = 0;
        assert!(matches!(cfg.validate(), Err(LivesError::InvalidMaxCount { .. })));
    }

    #[test]
    fn parses_config_file_shape() {
        let file: LivesConfigFile = serde_json::from_str(
            r#"{ "lives": { "max_count": 3, "refill_period_seconds": 1800 } }"#,
        )
        .unwrap();
        assert_eq!(file.lives.max_count, 3);
        assert_eq!(file.lives.refill_period_seconds, 1800.0);
        assert!(file.lives.icon.is_empty());
    }
}
