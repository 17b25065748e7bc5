use anyhow::{Context, Result};
use std::path::Path;

use super::{download, extract, info};
use crate::args::DownloadOptions;
use datasetplus_core::{config::Config, AudioProcessor};

/// Download a dataset, then summarize and extract one of its parquet files
pub fn run(
    repo_id: &str,
    options: &DownloadOptions,
    parquet: &Path,
    limit: usize,
    id_column: Option<String>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;

    let local_dir = download::download(repo_id, options, &config)?;
    println!("Downloaded {} to {}\n", repo_id, local_dir.display());

    let parquet = local_dir.join(parquet);
    if !parquet.is_file() {
        anyhow::bail!(
            "{} not found in the downloaded files (use --parquet to pick another)",
            parquet.display()
        );
    }

    let mut extract_options = config.extract.clone();
    if id_column.is_some() {
        extract_options.id_column = id_column;
    }

    // summary and extraction share one open source
    let mut processor = AudioProcessor::new(&parquet).with_options(extract_options);
    let summary = processor
        .get_metadata()
        .with_context(|| format!("Failed to read {}", parquet.display()))?;
    info::print_summary(&summary);

    let output_dir = local_dir.join(extract::DEFAULT_AUDIO_DIR);
    let result = extract::extract_with_progress(processor, &output_dir, Some(limit))?;
    extract::print_result(&result);

    Ok(())
}
