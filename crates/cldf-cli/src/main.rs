//! cldf CLI - validate and inspect CLDF datasets.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let default = if verbose { "cldf=debug" } else { "cldf=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate { dataset } => commands::validate::run(dataset, cli.verbose),
        Commands::Stats { dataset, json } => commands::stats::run(dataset, json, cli.verbose),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
