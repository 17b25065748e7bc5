//! Dataset download helper

use crate::config::Config;
use datasetplus_hub::{HfHubClient, HubClient, RemoteFetchError, RepoKind, CACHE_DIR_NAME};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Downloads hub repositories into local directories
#[derive(Debug)]
pub struct DatasetFetcher<C: HubClient = HfHubClient> {
    client: C,
    no_cache: bool,
}

impl DatasetFetcher<HfHubClient> {
    /// Fetcher using the hub settings of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(HfHubClient::new(config.fetch_options())).no_cache(config.download.no_cache)
    }
}

impl<C: HubClient> DatasetFetcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            no_cache: false,
        }
    }

    /// Remove the hub cache under the download directory afterwards
    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Download `repo_id` into `local_dir` and return the local path.
    ///
    /// Failures are returned as-is, nothing is retried.
    pub fn download(
        &self,
        repo_id: &str,
        local_dir: &Path,
        repo_type: RepoKind,
    ) -> Result<PathBuf, RemoteFetchError> {
        info!("Downloading {} {} to {}", repo_type, repo_id, local_dir.display());

        let path = self.client.fetch(repo_id, local_dir, repo_type)?;

        if self.no_cache {
            let cache = local_dir.join(CACHE_DIR_NAME);
            if cache.is_dir() {
                debug!("Removing hub cache {}", cache.display());
                if let Err(e) = std::fs::remove_dir_all(&cache) {
                    warn!("Failed to remove {}: {}", cache.display(), e);
                }
            }
        }

        info!("Downloaded {} to {}", repo_id, path.display());
        Ok(path)
    }
}
