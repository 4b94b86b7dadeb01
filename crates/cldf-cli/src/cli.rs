//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cldf: validate and inspect CLDF datasets
#[derive(Parser)]
#[command(name = "cldf")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a dataset, reporting every problem found
    Validate {
        /// Metadata file, or a core data file such as values.csv
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,
    },

    /// Show dataset properties and row counts per table
    Stats {
        /// Metadata file, or a core data file such as values.csv
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_stats() {
        let cli = Cli::parse_from(["cldf", "stats", "ds-metadata.json", "--json", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Stats { dataset, json } => {
                assert_eq!(dataset, PathBuf::from("ds-metadata.json"));
                assert!(json);
            }
            Commands::Validate { .. } => panic!("expected stats"),
        }
    }
}
