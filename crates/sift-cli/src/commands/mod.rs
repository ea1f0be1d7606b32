//! CLI command implementations
//!
//! - `analyze` - Load records, run the pipeline, write the JSON report
//! - `config` - Show the effective analysis configuration

pub mod analyze;
pub mod config;

// Re-export command functions for main.rs
pub use analyze::*;
pub use config::*;
