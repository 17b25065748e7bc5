//! Selection of repository files to download

use crate::RemoteFetchError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};
use tracing::warn;

/// Glob patterns whose matching repository paths are skipped.
///
/// `*` also matches `/`, and a pattern ending in `/` matches everything below
/// that directory, the same way the hub's own `ignore_patterns` behave.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    set: GlobSet,
}

impl IgnoreFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RemoteFetchError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let expanded = if pattern.ends_with('/') {
                format!("{}*", pattern)
            } else {
                pattern.to_string()
            };

            let glob = GlobBuilder::new(&expanded)
                .literal_separator(false)
                .build()
                .map_err(|source| RemoteFetchError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }

        let set = builder
            .build()
            .map_err(|source| RemoteFetchError::InvalidPattern {
                pattern: "<set>".to_string(),
                source,
            })?;

        Ok(Self { set })
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.set.is_match(path)
    }
}

/// Pick the repository paths to fetch from a listing.
///
/// With `filename` set only that path is kept and it must be present in the
/// listing. Paths escaping the destination directory are dropped.
pub fn select_files<'a>(
    repo_id: &str,
    listing: impl IntoIterator<Item = &'a str>,
    filename: Option<&str>,
    filter: &IgnoreFilter,
) -> Result<Vec<String>, RemoteFetchError> {
    let listing: Vec<&str> = listing.into_iter().collect();

    if let Some(name) = filename {
        return if listing.contains(&name) {
            Ok(vec![name.to_string()])
        } else {
            Err(RemoteFetchError::NotFound(format!("{}/{}", repo_id, name)))
        };
    }

    let files: Vec<String> = listing
        .into_iter()
        .filter(|path| {
            let safe = Path::new(path)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !safe {
                warn!("Skipping unsafe repository path: {}", path);
            }
            safe
        })
        .filter(|path| !filter.is_ignored(path))
        .map(String::from)
        .collect();

    if files.is_empty() {
        return Err(RemoteFetchError::NoFiles(repo_id.to_string()));
    }

    Ok(files)
}
