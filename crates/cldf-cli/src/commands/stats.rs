//! Stats command - show dataset properties and table sizes.

use std::path::PathBuf;

use colored::Colorize;

use super::load_dataset;

pub fn run(
    dataset: PathBuf,
    json_output: bool,
    _verbose: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let ds = load_dataset(&dataset)?;
    let stats = ds.stats()?;

    if json_output {
        let summary = serde_json::json!({
            "dataset": ds.to_string(),
            "module": ds.module(),
            "version": ds.version(),
            "properties": ds.properties(),
            "tables": stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(true);
    }

    println!("{}", ds.to_string().cyan().bold());
    println!();

    let properties: Vec<_> = ds
        .properties()
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .collect();
    if !properties.is_empty() {
        println!("{}", "Properties:".yellow().bold());
        let width = properties.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in properties {
            let text = value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            println!("  {:<width$}  {}", key, text, width = width);
        }
        println!();
    }

    println!("{}", "Tables:".yellow().bold());
    let name_width = stats.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let kind_width = stats.iter().map(|s| s.kind.len()).max().unwrap_or(0);
    for table in &stats {
        println!(
            "  {:<nw$}  {:<kw$}  {}",
            table.name,
            table.kind,
            table.rows.to_string().white().bold(),
            nw = name_width,
            kw = kind_width
        );
    }
    Ok(true)
}
