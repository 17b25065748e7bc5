//! Repository identifiers and kinds

use crate::RemoteFetchError;
use hf_hub::RepoType;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest repository id the hub accepts
const MAX_REPO_ID_LEN: usize = 96;

/// Which hub namespace a repository lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    #[default]
    Dataset,
    Model,
    Space,
}

impl RepoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoKind::Dataset => "dataset",
            RepoKind::Model => "model",
            RepoKind::Space => "space",
        }
    }

    pub(crate) fn repo_type(self) -> RepoType {
        match self {
            RepoKind::Dataset => RepoType::Dataset,
            RepoKind::Model => RepoType::Model,
            RepoKind::Space => RepoType::Space,
        }
    }
}

impl std::fmt::Display for RepoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoKind {
    type Err = RemoteFetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dataset" | "datasets" => Ok(RepoKind::Dataset),
            "model" | "models" => Ok(RepoKind::Model),
            "space" | "spaces" => Ok(RepoKind::Space),
            other => Err(RemoteFetchError::UnknownRepoType(other.to_string())),
        }
    }
}

/// Validate that a string looks like a hub repository id (`name` or `owner/name`)
pub fn validate_repo_id(repo_id: &str) -> bool {
    if repo_id.is_empty()
        || repo_id.len() > MAX_REPO_ID_LEN
        || repo_id.contains("--")
        || repo_id.contains("..")
    {
        return false;
    }

    regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(/[A-Za-z0-9][A-Za-z0-9._-]*)?$")
        .map(|re| re.is_match(repo_id))
        .unwrap_or(false)
}
