//! Validate command - check a dataset and list what is wrong with it.

use std::path::PathBuf;

use colored::Colorize;
use cldf::{Severity, ValidationLog};

use super::load_dataset;

pub fn run(dataset: PathBuf, verbose: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let ds = load_dataset(&dataset)?;

    println!("{} {}", "Validating".cyan().bold(), ds.to_string().white());

    let mut log = ValidationLog::new();
    let valid = ds.validate(Some(&mut log))?;

    for observation in log.iter() {
        let label = format!("{:<8}", observation.severity.label());
        let label = match observation.severity {
            Severity::Error => label.red().bold(),
            Severity::Warning => label.yellow().bold(),
            Severity::Info if verbose => label.blue(),
            Severity::Info => continue,
        };
        println!("  {} {}", label, observation);
    }
    println!();

    let errors = log.errors().count();
    let warnings = log.warnings().count();
    if valid {
        println!(
            "{} ({} warnings)",
            "Dataset is valid".green().bold(),
            warnings
        );
    } else {
        println!(
            "{} ({} errors, {} warnings)",
            "Dataset is invalid".red().bold(),
            errors,
            warnings
        );
    }
    Ok(valid)
}
