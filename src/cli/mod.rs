//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fightgraph",
    version,
    author = "neur0map",
    about = "Discover fighters through linked profiles and search them offline",
    long_about = "fightgraph walks the opponent links between fighter profiles breadth-first, \
                  rate-limiting every fetch, and keeps a local name index that can be searched \
                  without network access."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/fightgraph/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover fighters starting from one or more profile identifiers
    Discover {
        /// Starting identifiers
        #[arg(required = true)]
        ids: Vec<String>,

        /// Maximum number of hops from the starting identifiers
        #[arg(short, long)]
        depth: Option<usize>,

        /// Stop a level after this many new fighters
        #[arg(short, long, value_parser = positive_count)]
        per_depth: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Continue discovery from a random sample of already indexed fighters
    Expand {
        /// Maximum number of hops from each sampled fighter
        #[arg(short, long)]
        depth: Option<usize>,

        /// Stop a level after this many new fighters
        #[arg(short, long, value_parser = positive_count)]
        per_depth: Option<usize>,

        /// Number of indexed fighters to start from
        #[arg(short, long, value_parser = positive_count)]
        sample: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the local index by name or nickname
    Search {
        /// Name or nickname fragment
        query: String,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Parse a count that must be at least 1
fn positive_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
