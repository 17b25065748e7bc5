//! Error types for Hugging Face Hub access

use hf_hub::api::sync::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteFetchError {
    #[error("Invalid repository id: {0:?}")]
    InvalidRepoId(String),

    #[error("Unknown repository type: {0} (expected dataset, model or space)")]
    UnknownRepoType(String),

    #[error("Hub request for {repo_id} failed: {source}")]
    Api {
        repo_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Not found on the hub: {0}")]
    NotFound(String),

    #[error("Invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("No files left to download from {0}")]
    NoFiles(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
