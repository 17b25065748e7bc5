//! Configuration management for datasetplus

use crate::error::ConfigError;
use datasetplus_hub::{FetchOptions, RepoKind};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub hub: HubConfig,
    pub download: DownloadConfig,
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Access token (falls back to `HF_TOKEN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Hub cache directory (defaults to `<download dir>/.cache`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Hub base URL (falls back to `HF_ENDPOINT`, then huggingface.co)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Branch, tag or commit to download
    pub revision: String,
    /// Default repository namespace
    pub repo_type: RepoKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Default download directory
    pub default_directory: PathBuf,
    /// Glob patterns of repository files to skip
    pub ignore_patterns: Vec<String>,
    /// Remove the hub cache after downloading
    pub no_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Extension used when neither a path hint nor the payload reveals one
    pub default_extension: String,
    /// Stem prefix for files named by row position
    pub filename_prefix: String,
    /// Zero padding of the row index in positional names
    pub index_width: usize,
    /// Name of the JSON Lines metadata file written next to the audio
    pub metadata_file: String,
    /// Rows included in the dataset summary sample
    pub sample_rows: usize,
    /// Audio column to use instead of auto-detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_column: Option<String>,
    /// Column whose value names the extracted files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            token: None,
            cache_dir: None,
            endpoint: None,
            revision: datasetplus_hub::DEFAULT_REVISION.to_string(),
            repo_type: RepoKind::Dataset,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            default_directory: PathBuf::from("."),
            ignore_patterns: Vec::new(),
            no_cache: false,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            default_extension: "wav".to_string(),
            filename_prefix: "audio".to_string(),
            index_width: 5,
            metadata_file: "metadata.jsonl".to_string(),
            sample_rows: 5,
            audio_column: None,
            id_column: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(config_file)
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(default_config) = Self::default_path() {
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::raw().only(&["HF_TOKEN"]).map(|_| "hub.token".into()))
            .merge(Env::raw().only(&["HF_ENDPOINT"]).map(|_| "hub.endpoint".into()))
            .merge(Env::prefixed("DATASETPLUS_").split("__"))
    }

    /// Location of the per-user config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("datasetplus/config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let extract = &self.extract;

        if extract.index_width == 0 || extract.index_width > 12 {
            return Err(ConfigError::InvalidValue(format!(
                "extract.index_width must be between 1 and 12, got {}",
                extract.index_width
            )));
        }

        if extract.default_extension.is_empty()
            || !extract
                .default_extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::InvalidValue(format!(
                "extract.default_extension must be alphanumeric, got {:?}",
                extract.default_extension
            )));
        }

        if extract.metadata_file.is_empty()
            || extract.metadata_file.contains(['/', '\\'])
            || extract.metadata_file.starts_with('.')
        {
            return Err(ConfigError::InvalidValue(format!(
                "extract.metadata_file must be a plain file name, got {:?}",
                extract.metadata_file
            )));
        }

        Ok(())
    }

    /// Hub client options for a download
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            revision: Some(self.hub.revision.clone()),
            filename: None,
            ignore_patterns: self.download.ignore_patterns.clone(),
            token: self.hub.token.clone(),
            cache_dir: self.hub.cache_dir.clone(),
            endpoint: self.hub.endpoint.clone(),
        }
    }
}
