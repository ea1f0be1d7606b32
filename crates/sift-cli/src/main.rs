//! Sift CLI - Spending analytics
//!
//! Usage:
//!   sift analyze --file records.csv                 Print the JSON report
//!   sift analyze --file records.csv -o report.json  Write it to a file
//!   sift config                                     Show the effective config

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so the JSON report can be piped from stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Analyze {
            file,
            output,
            config,
            labels,
            lexicon,
            today,
            seed,
        } => commands::cmd_analyze(
            &file,
            output.as_deref(),
            config.as_deref(),
            labels.as_deref(),
            lexicon.as_deref(),
            today.as_deref(),
            seed,
        ),
        Commands::Config { config } => commands::cmd_config(config.as_deref()),
    }
}
