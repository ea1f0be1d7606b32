//! Sift Core Library
//!
//! Batch analytics over dated, categorized spending records:
//! - Descriptive statistics, per-partition breakdowns and monthly trends
//! - Anomaly detection (top fraction by amount, or mean-multiple threshold)
//! - Amount clustering (1-D k-means, or mean +/- stddev banding)
//! - Gift, blacklist, imported and category profiles
//! - Monthly and daily forecasting (smoothing, seasonality, AR blending)
//! - Lexicon sentiment scoring with a keyword fallback
//! - Apriori association rules over daily category baskets
//! - CSV record loading, label lookup and TOML configuration

pub mod anomaly;
pub mod apriori;
pub mod cluster;
pub mod config;
pub mod error;
pub mod forecast;
pub mod import;
pub mod labels;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod sentiment;
pub mod stats;
pub mod text;
pub mod trends;

/// Record fixtures for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use anomaly::{AmountThreshold, AnomalyStrategy, TopFraction};
pub use apriori::{Apriori, AprioriConfig, AssociationRule, FrequentItemset, MiningResult};
pub use cluster::{BandClusterer, Cluster, ClusterStrategy, KMeansClusterer};
pub use config::{AnalysisConfig, AnomalyStrategyKind, ClusterStrategyKind};
pub use error::{Error, Result};
pub use forecast::{Forecast, ForecastConfig, Forecaster};
pub use labels::{LabelLookup, Labels};
pub use models::{SentimentLabel, TransactionRecord};
pub use pipeline::{AnalysisResult, Analyzer};
pub use profile::{Profile, ProfileBuilder, ProfileKind};
pub use sentiment::{KeywordScorer, Lexicon, LexiconScorer, SentimentEntry, SentimentScorer};
pub use stats::{Breakdowns, Stats};
