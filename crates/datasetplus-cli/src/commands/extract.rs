use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::args::ExtractOptions;
use datasetplus_core::{
    config::Config,
    AudioProcessor, ExtractionResult, Reporter, RowOutcome,
};

/// Directory name used when no output directory is given
pub const DEFAULT_AUDIO_DIR: &str = "audio_files";

pub fn run(parquet: &Path, options: &ExtractOptions, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let output_dir = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(parquet));

    let mut extract = config.extract.clone();
    if options.audio_column.is_some() {
        extract.audio_column = options.audio_column.clone();
    }
    if options.id_column.is_some() {
        extract.id_column = options.id_column.clone();
    }

    let processor = AudioProcessor::new(parquet).with_options(extract);
    let result = extract_with_progress(processor, &output_dir, options.limit)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn default_output_dir(parquet: &Path) -> PathBuf {
    parquet
        .parent()
        .map(|dir| dir.join(DEFAULT_AUDIO_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_DIR))
}

/// Run an extraction behind a progress bar, reusing the processor's open source
pub fn extract_with_progress(
    processor: AudioProcessor,
    output_dir: &Path,
    limit: Option<usize>,
) -> Result<ExtractionResult> {
    let progress = ProgressReporter::new()?;

    let mut processor = processor.with_reporter(progress.clone());
    let result = processor.extract_audio_files(output_dir, limit);

    match result {
        Ok(result) => {
            progress.pb.finish_with_message(format!(
                "Done: {}/{} rows",
                result.succeeded, result.attempted
            ));
            Ok(result)
        }
        Err(e) => {
            progress.pb.abandon_with_message("Failed");
            Err(e).with_context(|| {
                format!("Failed to extract audio from {}", processor.path().display())
            })
        }
    }
}

pub fn print_result(result: &ExtractionResult) {
    println!(
        "\nExtracted {}/{} rows into {}",
        result.succeeded,
        result.attempted,
        result.output_dir.display()
    );
    println!("Metadata: {}", result.metadata_path.display());

    if !result.skipped.is_empty() {
        println!(
            "\nSkipped {} rows ({:.1}%):",
            result.failed(),
            result.failure_rate() * 100.0
        );
        for row in &result.skipped {
            println!("  row {}: {}", row.index, row.reason);
        }
    }
}

/// Drives a progress bar and keeps log lines from tearing it
#[derive(Clone)]
struct ProgressReporter {
    pb: ProgressBar,
}

impl ProgressReporter {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
            )?
            .progress_chars("=>-"),
        );
        Ok(Self { pb })
    }
}

impl Reporter for ProgressReporter {
    fn info(&self, message: &str) {
        self.pb.suspend(|| tracing::info!("{}", message));
    }

    fn warn(&self, message: &str) {
        self.pb.suspend(|| tracing::warn!("{}", message));
    }

    fn error(&self, message: &str) {
        self.pb.suspend(|| tracing::error!("{}", message));
    }

    fn extraction_started(&self, planned: usize) {
        self.pb.set_length(planned as u64);
    }

    fn row_finished(&self, _index: usize, outcome: &RowOutcome<'_>) {
        if let RowOutcome::Written { file_name, .. } = outcome {
            self.pb.set_message(file_name.to_string());
        }
        self.pb.inc(1);
    }
}
