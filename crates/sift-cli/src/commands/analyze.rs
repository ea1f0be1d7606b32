//! Analyze command implementation

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sift_core::{import::parse_csv, AnalysisConfig, AnalysisResult, Analyzer, Labels, Lexicon};
use tracing::{info, warn};

/// Default lexicon location, used when --lexicon is not given
pub fn default_lexicon_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("sentiment.json"))
}

/// Parse --today, falling back to the local date
pub fn resolve_today(today: Option<&str>) -> Result<NaiveDate> {
    match today {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid --today date (expected YYYY-MM-DD): {}", s)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn load_labels(path: Option<&Path>) -> Result<Labels> {
    match path {
        Some(path) => Labels::load(path)
            .with_context(|| format!("Failed to load labels: {}", path.display())),
        None => Ok(Labels::default()),
    }
}

/// Load the lexicon if one is available
///
/// A missing or unreadable lexicon is not fatal: sentiment falls back to the
/// keyword scorer.
fn load_lexicon(path: Option<&Path>) -> Option<Lexicon> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_lexicon_path().filter(|p| p.exists())?,
    };

    match Lexicon::load(&path) {
        Ok(lexicon) => {
            info!(
                path = %path.display(),
                positive = lexicon.positive.len(),
                negative = lexicon.negative.len(),
                "Loaded sentiment lexicon"
            );
            Some(lexicon)
        }
        Err(e) => {
            warn!(error = %e, "Lexicon unavailable, using keyword sentiment");
            None
        }
    }
}

/// Load records and run the full analysis
pub fn run_analysis(
    file: &Path,
    config_path: Option<&Path>,
    labels_path: Option<&Path>,
    lexicon_path: Option<&Path>,
    today: NaiveDate,
    seed: Option<u64>,
) -> Result<AnalysisResult> {
    let config = AnalysisConfig::load(config_path).context("Failed to load analysis config")?;
    let labels = load_labels(labels_path)?;

    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let records = parse_csv(csv_file, &labels)
        .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
    info!(records = records.len(), file = %file.display(), "Loaded records");

    let mut analyzer = Analyzer::new(config, &labels);
    if let Some(lexicon) = load_lexicon(lexicon_path) {
        analyzer = analyzer.with_lexicon(lexicon);
    }
    if let Some(seed) = seed {
        analyzer = analyzer.with_seed(seed);
    }

    Ok(analyzer.analyze(&records, today))
}

pub fn cmd_analyze(
    file: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    labels_path: Option<&Path>,
    lexicon_path: Option<&Path>,
    today: Option<&str>,
    seed: Option<u64>,
) -> Result<()> {
    let today = resolve_today(today)?;
    let result = run_analysis(file, config_path, labels_path, lexicon_path, today, seed)?;
    let json = serde_json::to_string_pretty(&result).context("Failed to serialize report")?;

    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("📊 Analyzed {} records", result.total_records);
            println!("   Anomalies: {}", result.anomalies.len());
            println!("   Clusters:  {}", result.clusters.len());
            println!("   Rules:     {}", result.association_rules.len());
            if let Some(forecast) = &result.forecast {
                let next = &forecast.monthly_predict.next_month;
                println!(
                    "   Forecast {}: {:.2} [{:.2}, {:.2}]",
                    next.month,
                    next.seasonal_adjusted,
                    next.confidence_interval[0],
                    next.confidence_interval[1]
                );
            }
            println!("✅ Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
