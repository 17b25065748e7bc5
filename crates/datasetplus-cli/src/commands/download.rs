use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::args::DownloadOptions;
use datasetplus_core::{config::Config, DatasetFetcher, RepoKind};
use datasetplus_hub::HfHubClient;

pub fn run(repo_id: &str, options: &DownloadOptions, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let local_dir = download(repo_id, options, &config)?;
    println!("\nDownloaded {} to {}", repo_id, local_dir.display());
    Ok(())
}

/// Download with command line options layered over the config
pub fn download(repo_id: &str, options: &DownloadOptions, config: &Config) -> Result<PathBuf> {
    let local_dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.download.default_directory.clone());

    let repo_type = options
        .repo_type
        .map(RepoKind::from)
        .unwrap_or(config.hub.repo_type);

    let mut fetch = config.fetch_options();
    fetch.filename = options.filename.clone();
    fetch
        .ignore_patterns
        .extend(options.ignore_patterns.iter().cloned());
    if let Some(ref revision) = options.revision {
        fetch.revision = Some(revision.clone());
    }

    let fetcher = DatasetFetcher::new(HfHubClient::new(fetch))
        .no_cache(options.no_cache || config.download.no_cache);

    fetcher
        .download(repo_id, &local_dir, repo_type)
        .with_context(|| format!("Failed to download {} {}", repo_type, repo_id))
}
