use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use travel_assistant::airports::parse_airports_csv;

/// Convert an OurAirports-style CSV into the keyed JSON dataset.
///
/// Usage: process_airports [input.csv] [output.json]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().unwrap_or_else(|| "/tmp/airports.csv".to_string()));
    let output = PathBuf::from(args.next().unwrap_or_else(|| "data/airports.json".to_string()));

    tracing::info!(input = %input.display(), "Processing airports CSV file");
    let content = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let (airports, stats) = parse_airports_csv(&content);
    tracing::info!(
        rows = stats.rows,
        with_iata = stats.with_iata,
        unique = airports.len(),
        "Parsed airports"
    );

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    write_dataset(&output, &airports.to_json_string()?)?;
    tracing::info!(output = %output.display(), "Airport dataset written");
    Ok(())
}

fn write_dataset(path: &Path, json: &str) -> Result<()> {
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
