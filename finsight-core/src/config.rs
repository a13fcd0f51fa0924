//! Metric window configuration passed into the engine.

use crate::domain::{MetricId, MetricKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Which computed rows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep a row when any rolling metric is present.
    #[default]
    AnyMetric,
    /// Keep a row only when the return and every rolling metric are present.
    AllMetrics,
}

/// Window sizes for every rolling metric family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Accepted for compatibility with older config files. Returns always
    /// compare against the immediately preceding close.
    pub return_window: Option<usize>,
    pub vol_windows: Vec<usize>,
    pub sma_windows: Vec<usize>,
    pub sharpe_windows: Vec<usize>,
    pub retention: RetentionPolicy,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            return_window: None,
            vol_windows: vec![20, 60],
            sma_windows: vec![20, 50],
            sharpe_windows: vec![20, 60],
            retention: RetentionPolicy::AnyMetric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{kind} window must be >= 1")]
    ZeroWindow { kind: &'static str },

    #[error("duplicate {kind} window {window}")]
    DuplicateWindow { kind: &'static str, window: usize },

    #[error("parse metrics TOML: {0}")]
    Parse(String),
}

impl MetricsConfig {
    /// Same windows for every family; handy for small-sample tests.
    pub fn uniform(window: usize) -> Self {
        Self {
            vol_windows: vec![window],
            sma_windows: vec![window],
            sharpe_windows: vec![window],
            ..Self::default()
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Parse from a TOML fragment (the `[metrics]` table body).
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in MetricKind::ALL {
            let mut seen = HashSet::new();
            for &window in self.windows(kind) {
                if window == 0 {
                    return Err(ConfigError::ZeroWindow {
                        kind: kind.prefix(),
                    });
                }
                if !seen.insert(window) {
                    return Err(ConfigError::DuplicateWindow {
                        kind: kind.prefix(),
                        window,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn windows(&self, kind: MetricKind) -> &[usize] {
        match kind {
            MetricKind::Volatility => &self.vol_windows,
            MetricKind::Sma => &self.sma_windows,
            MetricKind::Sharpe => &self.sharpe_windows,
        }
    }

    /// Every configured metric, grouped by kind in declaration order.
    pub fn metric_ids(&self) -> Vec<MetricId> {
        MetricKind::ALL
            .iter()
            .flat_map(|&kind| self.windows(kind).iter().map(move |&w| MetricId::new(kind, w)))
            .collect()
    }
}
