//! CLI module for the semantic engine
//!
//! - `serve`: run the HTTP API
//! - `check-config`: load and validate configuration, then exit

pub mod check_config;
pub mod serve;

use clap::{Parser, Subcommand};

/// Semantic Similarity Engine - prompt cache and duplicate work-item detection
#[derive(Parser)]
#[command(name = "semantic-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Validate configuration and print the effective settings
    CheckConfig(check_config::CheckConfigArgs),
}
