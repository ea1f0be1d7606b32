//! Analysis configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, else the override in the data dir
//!    (~/.local/share/sift/config/analysis.toml) when it exists
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from a file keep their default values. Numeric parameters are
//! not range-checked here; the components treat degenerate values as "no
//! result" rather than failing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::apriori::AprioriConfig;
use crate::error::{Error, Result};
use crate::forecast::ForecastConfig;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analysis.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyStrategyKind {
    #[default]
    TopFraction,
    Threshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategyKind {
    #[default]
    Kmeans,
    Banding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub strategy: AnomalyStrategyKind,
    /// Share of records flagged by the top-fraction strategy
    pub contamination: f64,
    /// Multiple of the mean amount used by the threshold strategy
    pub threshold_multiplier: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            strategy: AnomalyStrategyKind::TopFraction,
            contamination: 0.05,
            threshold_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub strategy: ClusterStrategyKind,
    pub k: usize,
    pub max_iterations: usize,
    /// Fixed seed for centroid initialization; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            strategy: ClusterStrategyKind::Kmeans,
            k: 3,
            max_iterations: 100,
            seed: None,
        }
    }
}

/// Keyword lists for the fallback sentiment scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub negative_keywords: Vec<String>,
    pub positive_keywords: Vec<String>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            negative_keywords: vec!["差".into(), "不好".into(), "极差".into()],
            positive_keywords: vec!["好".into(), "喜欢".into(), "满意".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Characters after the gift marker taken as the counterparty id
    pub gift_name_chars: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { gift_name_chars: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub anomaly: AnomalyConfig,
    pub cluster: ClusterConfig,
    pub apriori: AprioriConfig,
    pub forecast: ForecastConfig,
    pub sentiment: SentimentConfig,
    pub profile: ProfileConfig,
}

impl AnalysisConfig {
    /// Resolve and load the configuration
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        load_config(override_path)
    }

    /// The embedded default configuration
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("config").join("analysis.toml"))
}

/// Load configuration (explicit path, then data-dir override, then default)
fn load_config(override_path: Option<&Path>) -> Result<AnalysisConfig> {
    let content = if let Some(path) = override_path {
        debug!(path = %path.display(), "Loading analysis config");
        fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?
    } else {
        match default_config_path() {
            Some(default_path) if default_path.exists() => {
                debug!(path = %default_path.display(), "Loading analysis config override");
                fs::read_to_string(&default_path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
            }
            _ => DEFAULT_CONFIG.to_string(),
        }
    };

    parse_config(&content)
}

/// Parse config from TOML content
pub fn parse_config(content: &str) -> Result<AnalysisConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.anomaly.strategy, AnomalyStrategyKind::TopFraction);
        assert_eq!(config.cluster.k, 3);
        assert_eq!(config.cluster.seed, None);
        assert_eq!(config.apriori.min_support, 0.1);
        assert_eq!(config.forecast.alpha, 0.7);
        assert_eq!(config.profile.gift_name_chars, 1);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [cluster]
            strategy = "banding"
            seed = 7

            [apriori]
            min_support = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster.strategy, ClusterStrategyKind::Banding);
        assert_eq!(config.cluster.seed, Some(7));
        assert_eq!(config.cluster.max_iterations, 100);
        assert_eq!(config.apriori.min_support, 0.25);
        assert_eq!(config.apriori.min_confidence, 0.5);
        assert_eq!(config.sentiment, SentimentConfig::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let err = parse_config("[anomaly]\nstrategy = \"isolation_forest\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(parse_config("not = [toml").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[anomaly]\nstrategy = \"threshold\"").unwrap();

        let config = AnalysisConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.anomaly.strategy, AnomalyStrategyKind::Threshold);
        assert_eq!(config.anomaly.threshold_multiplier, 3.0);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = AnalysisConfig::load(Some(Path::new("/nonexistent/analysis.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
