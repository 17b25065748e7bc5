//! Hugging Face Hub bridge for datasetplus
//!
//! This crate wraps the `hf-hub` client behind a small [`HubClient`] trait:
//! - [`HfHubClient`]: lists a repository, filters it and materializes the files
//!   into a local directory
//! - [`IgnoreFilter`]: glob-based exclusion of repository paths

mod error;
mod filter;
mod repo;

pub use error::RemoteFetchError;
pub use filter::{select_files, IgnoreFilter};
pub use repo::{validate_repo_id, RepoKind};

use hf_hub::api::sync::{Api, ApiBuilder, ApiError};
use hf_hub::Repo;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the hub cache directory created inside the download directory
pub const CACHE_DIR_NAME: &str = ".cache";

/// Revision fetched when none is requested
pub const DEFAULT_REVISION: &str = "main";

/// Remote artifact retrieval
pub trait HubClient {
    /// Materialize `repo_id` under `local_dir` and return the local path
    fn fetch(
        &self,
        repo_id: &str,
        local_dir: &Path,
        kind: RepoKind,
    ) -> Result<PathBuf, RemoteFetchError>;
}

/// Per-client download options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Branch, tag or commit (defaults to `main`)
    pub revision: Option<String>,
    /// Fetch only this repository path
    pub filename: Option<String>,
    /// Glob patterns of repository paths to skip
    pub ignore_patterns: Vec<String>,
    /// Access token for private or gated repositories
    pub token: Option<String>,
    /// Hub cache location (defaults to `<local_dir>/.cache`)
    pub cache_dir: Option<PathBuf>,
    /// Hub base URL, overriding `HF_ENDPOINT`
    pub endpoint: Option<String>,
}

/// [`HubClient`] backed by the blocking `hf-hub` API
#[derive(Debug, Default)]
pub struct HfHubClient {
    options: FetchOptions,
}

impl HfHubClient {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn api(&self, local_dir: &Path) -> Result<Api, ApiError> {
        let cache_dir = self
            .options
            .cache_dir
            .clone()
            .unwrap_or_else(|| local_dir.join(CACHE_DIR_NAME));

        // from_env picks up HF_ENDPOINT
        let mut builder = ApiBuilder::from_env()
            .with_cache_dir(cache_dir)
            .with_progress(false);
        if let Some(endpoint) = &self.options.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        if self.options.token.is_some() {
            builder = builder.with_token(self.options.token.clone());
        }
        builder.build()
    }
}

impl HubClient for HfHubClient {
    fn fetch(
        &self,
        repo_id: &str,
        local_dir: &Path,
        kind: RepoKind,
    ) -> Result<PathBuf, RemoteFetchError> {
        if !validate_repo_id(repo_id) {
            return Err(RemoteFetchError::InvalidRepoId(repo_id.to_string()));
        }

        let filter = IgnoreFilter::new(&self.options.ignore_patterns)?;
        let api_error = |source| RemoteFetchError::Api {
            repo_id: repo_id.to_string(),
            source,
        };

        let revision = self
            .options
            .revision
            .clone()
            .unwrap_or_else(|| DEFAULT_REVISION.to_string());

        info!("Listing {} {} ({})", kind, repo_id, revision);

        let api = self.api(local_dir).map_err(api_error)?;
        let repo = api.repo(Repo::with_revision(
            repo_id.to_string(),
            kind.repo_type(),
            revision,
        ));

        // The listing must succeed before anything is created locally
        let listing = repo.info().map_err(api_error)?;
        let files = select_files(
            repo_id,
            listing.siblings.iter().map(|s| s.rfilename.as_str()),
            self.options.filename.as_deref(),
            &filter,
        )?;

        std::fs::create_dir_all(local_dir)?;

        for file in &files {
            debug!("Fetching {}", file);
            let cached = repo.get(file).map_err(api_error)?;

            let target = local_dir.join(file);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&cached, &target)?;
            debug!("Wrote {}", target.display());
        }

        info!("Fetched {} files into {}", files.len(), local_dir.display());
        Ok(local_dir.to_path_buf())
    }
}
