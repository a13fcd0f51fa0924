//! Runner configuration: metric windows, store location, refresh fan-out.
//!
//! Loaded from TOML. Every section and field has a default, so an empty file
//! is a valid configuration:
//!
//! ```toml
//! [metrics]
//! vol_windows = [20, 60]
//! sma_windows = [20, 50]
//! sharpe_windows = [20, 60]
//! retention = "any_metric"
//!
//! [store]
//! root = "data/finsight"
//!
//! [refresh]
//! max_concurrency = 4
//! ```
//!
//! `FINSIGHT_STORE_ROOT` and `FINSIGHT_MAX_CONCURRENCY` override the file.

use anyhow::{Context, Result};
use finsight_core::store::StoreConfig;
use finsight_core::MetricsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_STORE_ROOT: &str = "FINSIGHT_STORE_ROOT";
pub const ENV_MAX_CONCURRENCY: &str = "FINSIGHT_MAX_CONCURRENCY";

/// Batch refresh settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Worker threads in the private refresh pool.
    pub max_concurrency: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinsightConfig {
    pub metrics: MetricsConfig,
    pub store: StoreConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Metrics(#[from] finsight_core::ConfigError),

    #[error("refresh.max_concurrency must be >= 1")]
    ZeroConcurrency,

    #[error("store.root must not be empty")]
    EmptyStoreRoot,
}

impl FinsightConfig {
    /// Parse and validate a TOML document. Environment overrides are not
    /// applied.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("failed to parse FinSight config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, apply environment overrides, then validate.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FINSIGHT_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = lookup(ENV_STORE_ROOT) {
            self.store.root = PathBuf::from(root);
        }
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            self.refresh.max_concurrency = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_CONCURRENCY} is not a number: {raw:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.metrics.validate()?;
        if self.refresh.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.store.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoreRoot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::RetentionPolicy;
    use std::collections::HashMap;

    #[test]
    fn empty_document_is_default() {
        let config = FinsightConfig::from_toml("").unwrap();
        assert_eq!(config, FinsightConfig::default());
        assert_eq!(config.refresh.max_concurrency, 4);
        assert_eq!(config.metrics.vol_windows, vec![20, 60]);
    }

    #[test]
    fn sections_override_defaults() {
        let config = FinsightConfig::from_toml(
            r#"
            [metrics]
            sma_windows = [10]
            retention = "all_metrics"

            [store]
            root = "/tmp/fs"

            [refresh]
            max_concurrency = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.metrics.sma_windows, vec![10]);
        assert_eq!(config.metrics.sharpe_windows, vec![20, 60]);
        assert_eq!(config.metrics.retention, RetentionPolicy::AllMetrics);
        assert_eq!(config.store.root, PathBuf::from("/tmp/fs"));
        assert_eq!(config.refresh.max_concurrency, 8);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = FinsightConfig::from_toml("[refresh]\nmax_concurrency = 0").unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));
    }

    #[test]
    fn bad_window_is_rejected() {
        assert!(FinsightConfig::from_toml("[metrics]\nvol_windows = [0]").is_err());
    }

    #[test]
    fn overrides_apply() {
        let env: HashMap<&str, &str> = [
            (ENV_STORE_ROOT, "/srv/finsight"),
            (ENV_MAX_CONCURRENCY, " 2 "),
        ]
        .into_iter()
        .collect();
        let mut config = FinsightConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.store.root, PathBuf::from("/srv/finsight"));
        assert_eq!(config.refresh.max_concurrency, 2);
    }

    #[test]
    fn non_numeric_override_fails() {
        let mut config = FinsightConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_MAX_CONCURRENCY).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_CONCURRENCY));
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = FinsightConfig::from_file(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));

        let path = dir.path().join("finsight.toml");
        std::fs::write(&path, "[refresh]\nmax_concurrency = 3\n").unwrap();
        let config = FinsightConfig::from_file(&path).unwrap();
        // Environment may override; either way the result validates.
        assert!(config.refresh.max_concurrency >= 1);
    }
}
