//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - Spending analytics from a CSV of transactions
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Batch spending analyzer: stats, anomalies, clusters, forecasts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a CSV of transactions and write the JSON report
    Analyze {
        /// CSV file with columns type,remark,amount,date[,product,country,quantity]
        #[arg(short, long)]
        file: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Analysis config (TOML); defaults to the data-dir override or built-in values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Label file (flat JSON object) overriding the built-in labels
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Sentiment lexicon (JSON with "positive" and "negative" lists)
        ///
        /// Without a lexicon, sentiment falls back to the configured keywords.
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// Analysis date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<String>,

        /// Seed for cluster initialization (reproducible output)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the effective analysis configuration
    Config {
        /// Config file to load instead of the default resolution
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
