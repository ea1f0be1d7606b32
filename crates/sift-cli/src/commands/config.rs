//! Config command implementation

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::config::default_config_path;
use sift_core::AnalysisConfig;

/// Render the effective configuration as TOML
pub fn render_config(config_path: Option<&Path>) -> Result<String> {
    let config = AnalysisConfig::load(config_path).context("Failed to load analysis config")?;
    toml::to_string_pretty(&config).context("Failed to render config")
}

pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => println!("# Source: {}", path.display()),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => println!("# Source: {}", path.display()),
            None => println!("# Source: built-in defaults"),
        },
    }
    println!("{}", render_config(config_path)?);
    Ok(())
}
