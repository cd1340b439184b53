//! Command line argument parsing for Braid CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::hybrid::config::FusionAlgorithm;
use crate::hybrid::search::searcher::SearchStrategy;

/// Braid - hybrid vector and keyword search over a JSONL corpus
#[derive(Parser, Debug, Clone)]
#[command(name = "braid")]
#[command(about = "Hybrid vector and keyword search with rank fusion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct BraidArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl BraidArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search a corpus
    Search(SearchArgs),

    /// Run the health check against a corpus
    Health(HealthArgs),
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// JSONL corpus of {id, tenantId, content, metadata} records
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Tenant to search within
    #[arg(short, long)]
    pub tenant: String,

    /// Retrieval strategy (auto, vector, keyword, hybrid)
    #[arg(short, long, default_value = "auto")]
    pub strategy: SearchStrategy,

    /// Fusion algorithm (rrf, weighted, adaptive); overrides the config file
    #[arg(short, long)]
    pub algorithm: Option<FusionAlgorithm>,

    /// Maximum number of results to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Metadata filter as KEY=VALUE (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Run the vector and keyword searches one after the other
    #[arg(long)]
    pub sequential: bool,

    /// Omit result metadata
    #[arg(long)]
    pub no_metadata: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for the health check
#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    /// JSONL corpus of {id, tenantId, content, metadata} records
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
