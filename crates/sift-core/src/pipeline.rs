//! Analysis orchestration
//!
//! [`Analyzer`] builds the configured strategies and runs every analysis
//! branch over one immutable record slice, in a fixed order, into a single
//! [`AnalysisResult`]. A branch that fails is logged and left empty; it never
//! stops the others.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::anomaly::{self, AmountThreshold, AnomalyStrategy, TopFraction};
use crate::apriori::{self, Apriori, AssociationRule};
use crate::cluster::{self, BandClusterer, Cluster, ClusterStrategy, KMeansClusterer};
use crate::config::{AnalysisConfig, AnomalyStrategyKind, ClusterStrategyKind};
use crate::forecast::{Forecast, Forecaster};
use crate::labels::{self, LabelLookup};
use crate::models::TransactionRecord;
use crate::profile::{Profile, ProfileBuilder};
use crate::sentiment::{
    self, KeywordScorer, Lexicon, LexiconScorer, SentimentEntry, SentimentScorer,
};
use crate::stats::{Breakdowns, Stats};
use crate::text;
use crate::trends::{self, ConsumptionPatterns, MonthlyTrend, TimePoint};

/// Everything one analysis run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub lang: String,
    /// Local time of the run, "YYYY-MM-DD HH:MM:SS"
    pub generated_time: String,
    pub total_records: usize,
    pub summary: Stats,
    #[serde(serialize_with = "text::serialize_clean_keys")]
    pub category_total: BTreeMap<String, f64>,
    pub breakdowns: Breakdowns,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub patterns: ConsumptionPatterns,
    /// "remark (amount)" for each flagged record, in detection order
    #[serde(serialize_with = "text::serialize_clean_vec")]
    pub anomalies: Vec<String>,
    pub clusters: Vec<Cluster>,
    pub user_profiles: Vec<Profile>,
    pub time_series: Vec<TimePoint>,
    pub association_rules: Vec<AssociationRule>,
    pub sentiment_analysis: Vec<SentimentEntry>,
    /// Absent when the forecast could not be computed
    #[serde(flatten)]
    pub forecast: Option<Forecast>,
}

impl AnalysisResult {
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the full analysis pipeline
pub struct Analyzer<'a> {
    config: AnalysisConfig,
    labels: &'a dyn LabelLookup,
    lexicon: Option<Lexicon>,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: AnalysisConfig, labels: &'a dyn LabelLookup) -> Self {
        Self {
            config,
            labels,
            lexicon: None,
        }
    }

    /// Score sentiment with a lexicon instead of the keyword fallback
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    /// Pin the centroid seed, overriding the configured one
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.cluster.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn anomaly_strategy(&self) -> Box<dyn AnomalyStrategy> {
        let anomaly = &self.config.anomaly;
        match anomaly.strategy {
            AnomalyStrategyKind::TopFraction => Box::new(TopFraction::new(anomaly.contamination)),
            AnomalyStrategyKind::Threshold => {
                Box::new(AmountThreshold::new(anomaly.threshold_multiplier))
            }
        }
    }

    fn cluster_strategy(&self) -> Box<dyn ClusterStrategy> {
        let cluster = &self.config.cluster;
        match cluster.strategy {
            ClusterStrategyKind::Kmeans => {
                let rng = match cluster.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Box::new(KMeansClusterer::new(cluster.k, cluster.max_iterations, rng))
            }
            ClusterStrategyKind::Banding => Box::new(BandClusterer::new()),
        }
    }

    fn sentiment_scorer(&self) -> Box<dyn SentimentScorer> {
        match &self.lexicon {
            Some(lexicon) => Box::new(LexiconScorer::new(lexicon.clone())),
            None => {
                let keywords = &self.config.sentiment;
                Box::new(
                    KeywordScorer::new(
                        keywords.negative_keywords.clone(),
                        keywords.positive_keywords.clone(),
                    )
                    .with_negative_marker(self.labels.label(labels::BLACKLIST)),
                )
            }
        }
    }

    /// Analyze `records` as of `today`
    ///
    /// `today` decides which month is in progress for the forecast.
    pub fn analyze(&self, records: &[TransactionRecord], today: NaiveDate) -> AnalysisResult {
        info!(records = records.len(), %today, "Starting analysis");

        let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
        let summary = Stats::from_values(&amounts);

        let detector = self.anomaly_strategy();
        let flagged = detector.detect(records);
        debug!(strategy = detector.name(), flagged = flagged.len(), "Anomalies detected");
        let anomalies = anomaly::describe(records, &flagged);

        let mut clusterer = self.cluster_strategy();
        let mut clusters = clusterer.cluster(records);
        cluster::apply_labels(&mut clusters, self.labels);
        debug!(strategy = clusterer.name(), clusters = clusters.len(), "Clustering done");

        let user_profiles =
            ProfileBuilder::new(self.labels, self.config.profile.gift_name_chars).build(records);

        let forecast = match Forecaster::new(self.config.forecast)
            .forecast(records.iter().map(|r| (r.date, r.amount)), today)
        {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                warn!(error = %e, "Forecast failed");
                None
            }
        };

        let scorer = self.sentiment_scorer();
        let sentiment_analysis =
            sentiment::score_all(scorer.as_ref(), records.iter().map(|r| r.remark.as_str()));
        debug!(scorer = scorer.name(), "Sentiment scored");

        let transactions = apriori::daily_transactions(records);
        let association_rules = Apriori::new(self.config.apriori).rules(&transactions);
        debug!(
            transactions = transactions.len(),
            rules = association_rules.len(),
            "Association rules mined"
        );

        let result = AnalysisResult {
            lang: self.labels.label(labels::LANG_CODE),
            generated_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_records: records.len(),
            summary,
            category_total: trends::category_totals(records),
            breakdowns: Breakdowns::from_records(records),
            monthly_trend: trends::monthly_trend(records),
            patterns: trends::consumption_patterns(records),
            anomalies,
            clusters,
            user_profiles,
            time_series: trends::daily_series(records),
            association_rules,
            sentiment_analysis,
            forecast,
        };

        info!(
            anomalies = result.anomalies.len(),
            clusters = result.clusters.len(),
            profiles = result.user_profiles.len(),
            rules = result.association_rules.len(),
            "Analysis complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Labels;
    use crate::models::SentimentLabel;
    use crate::test_utils::{date, record};

    fn sample_records() -> Vec<TransactionRecord> {
        vec![
            record("food", "午饭 很满意", 30.0, "2024-01-05"),
            record("drink", "咖啡", 15.0, "2024-01-05"),
            record("food", "晚饭", 45.0, "2024-01-12"),
            record("drink", "奶茶 不好", 12.0, "2024-01-12"),
            record("gift", "送王 生日", 500.0, "2024-01-20"),
            record("food", "黑名单外卖", 25.0, "2024-02-02").with_blacklist(true),
            record("drink", "果汁", 10.0, "2024-02-02"),
            record("food", "早饭", 8.0, "2024-02-14"),
            record("food", "进口零食", 60.0, "2024-02-14").with_imported(true),
            record("drink", "可乐", 5.0, "2024-03-03"),
        ]
    }

    fn analyzer(labels: &Labels) -> Analyzer<'_> {
        Analyzer::new(AnalysisConfig::default(), labels).with_seed(42)
    }

    #[test]
    fn test_analyze_populates_every_branch() {
        let labels = Labels::default();
        let records = sample_records();
        let result = analyzer(&labels).analyze(&records, date("2024-03-10"));

        assert_eq!(result.total_records, 10);
        assert_eq!(result.lang, "zh_CN");
        assert_eq!(result.summary.count, 10);
        assert_eq!(result.summary.max, 500.0);

        // round(10 * 0.05) = 1 -> the gift
        assert_eq!(result.anomalies, vec!["送王 生日 (500.00)"]);

        let mut members: Vec<usize> = result
            .clusters
            .iter()
            .flat_map(|c| c.member_indices.iter().copied())
            .collect();
        members.sort_unstable();
        assert_eq!(members, (0..10).collect::<Vec<_>>());

        assert!(result
            .user_profiles
            .iter()
            .any(|p| p.user_id == "王" && p.label == "人情往来"));

        // food and drink co-occur on every day with more than one category
        assert!(result
            .association_rules
            .iter()
            .any(|r| r.antecedent == vec!["drink"] && r.consequent == vec!["food"]));

        assert_eq!(result.sentiment_analysis.len(), 10);
        assert_eq!(result.sentiment_analysis[0].sentiment, SentimentLabel::Positive);
        assert_eq!(result.sentiment_analysis[3].sentiment, SentimentLabel::Negative);
        // Blacklist marker counts as negative in the keyword fallback
        assert_eq!(result.sentiment_analysis[5].sentiment, SentimentLabel::Negative);

        let forecast = result.forecast.expect("forecast");
        assert_eq!(forecast.monthly_predict.this_month.month, "2024-03");
        assert_eq!(forecast.model.history_months, 2);

        assert_eq!(result.time_series.len(), 6);
        assert_eq!(result.monthly_trend.len(), 3);
        assert_eq!(result.patterns.blacklist_count, 1);
        assert_eq!(result.patterns.imported_count, 1);
    }

    #[test]
    fn test_cluster_labels_are_semantic() {
        let labels = Labels::default();
        let mut config = AnalysisConfig::default();
        config.cluster.strategy = ClusterStrategyKind::Banding;
        let result =
            Analyzer::new(config, &labels).analyze(&sample_records(), date("2024-03-10"));

        // The gift is the only record above mean + stddev
        let high = &result.clusters[0];
        assert_eq!(high.label, "高消费群");
        assert_eq!(high.member_indices, vec![4]);
        // The mid band holds the blacklisted record
        assert_eq!(result.clusters[1].label, "中等消费群 (黑名单)");
    }

    #[test]
    fn test_lexicon_replaces_keywords() {
        let labels = Labels::default();
        let lexicon = Lexicon::new(["咖啡"], Vec::<String>::new());
        let result = analyzer(&labels)
            .with_lexicon(lexicon)
            .analyze(&sample_records(), date("2024-03-10"));

        assert_eq!(result.sentiment_analysis[0].sentiment, SentimentLabel::Neutral);
        assert_eq!(result.sentiment_analysis[1].sentiment, SentimentLabel::Positive);
    }

    #[test]
    fn test_threshold_strategy() {
        let labels = Labels::default();
        let mut config = AnalysisConfig::default();
        config.anomaly.strategy = AnomalyStrategyKind::Threshold;
        let result = Analyzer::new(config, &labels)
            .with_seed(1)
            .analyze(&sample_records(), date("2024-03-10"));

        // Mean is 71, limit 213
        assert_eq!(result.anomalies, vec!["送王 生日 (500.00)"]);
    }

    #[test]
    fn test_same_seed_same_result() {
        let labels = Labels::default();
        let records = sample_records();
        let a = analyzer(&labels).analyze(&records, date("2024-03-10"));
        let b = analyzer(&labels).analyze(&records, date("2024-03-10"));
        assert_eq!(a.clusters, b.clusters);
        assert_eq!(a.forecast, b.forecast);
        assert_eq!(a.association_rules, b.association_rules);
    }

    #[test]
    fn test_empty_input() {
        let labels = Labels::default();
        let result = analyzer(&labels).analyze(&[], date("2024-03-10"));

        assert_eq!(result.total_records, 0);
        assert!(result.anomalies.is_empty());
        assert!(result.clusters.is_empty());
        assert!(result.user_profiles.is_empty());
        assert!(result.association_rules.is_empty());
        assert!(result.sentiment_analysis.is_empty());
        assert_eq!(
            result.forecast.expect("forecast").daily_predict.this_month.len(),
            31
        );
    }

    #[test]
    fn test_json_layout() {
        let labels = Labels::default();
        let result = analyzer(&labels).analyze(&sample_records(), date("2024-03-10"));
        let json: serde_json::Value =
            serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();

        for key in [
            "lang",
            "generated_time",
            "total_records",
            "category_total",
            "anomalies",
            "clusters",
            "user_profiles",
            "time_series",
            "association_rules",
            "sentiment_analysis",
            "monthly_predict",
            "daily_predict",
            "forecast_model",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }

        let cluster = &json["clusters"][0];
        assert!(cluster.get("label").is_some());
        assert!(cluster.get("member_indices").is_some());
        assert!(cluster.get("cluster_total").is_some());
        assert!(cluster.get("rank").is_none());

        let rule = &json["association_rules"][0];
        assert!(rule.get("lhs").is_some());
        assert!(rule.get("rhs").is_some());
        assert!(rule.get("lift").is_some());

        assert_eq!(json["sentiment_analysis"][0]["sentiment"], "positive");
        assert_eq!(json["time_series"][0]["date"], "2024-01-05");
        assert_eq!(json["generated_time"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_serialized_text_is_trimmed() {
        let labels = Labels::default();
        let records = vec![record("food", "  padded remark  ", 3.0, "2024-01-01")];
        let result = analyzer(&labels).analyze(&records, date("2024-03-10"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sentiment_analysis"][0]["remark"], "padded remark");
    }
}
