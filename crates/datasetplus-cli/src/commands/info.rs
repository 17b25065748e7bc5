use anyhow::{Context, Result};
use std::path::Path;

use datasetplus_core::{config::Config, AudioProcessor, DatasetSummary};

pub fn run(
    parquet: &Path,
    audio_column: Option<String>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;

    let mut extract = config.extract.clone();
    if audio_column.is_some() {
        extract.audio_column = audio_column;
    }

    let summary = AudioProcessor::new(parquet)
        .with_options(extract)
        .get_metadata()
        .with_context(|| format!("Failed to read {}", parquet.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

pub fn print_summary(summary: &DatasetSummary) {
    println!("{}\n", summary.path.display());
    println!("  rows = {}", summary.num_rows);
    println!(
        "  audio_column = {:?} ({})",
        summary.audio_column, summary.audio_layout
    );
    match summary.sampling_rate {
        Some(rate) => println!("  sampling_rate = {} Hz", rate),
        None => println!("  sampling_rate = (not declared)"),
    }
    match summary.audio_size_mb {
        Some(mb) => println!("  audio_size = {:.2} MB", mb),
        None => println!("  audio_size = (unknown)"),
    }

    println!("\nColumns:");
    for column in &summary.columns {
        println!("  {:<24} {:<8} {}", column.name, column.kind, column.data_type);
    }

    if !summary.sample.is_empty() {
        println!("\nFirst {} rows:", summary.sample.len());
        for row in &summary.sample {
            println!("  {}", serde_json::Value::Object(row.clone()));
        }
    }
}
