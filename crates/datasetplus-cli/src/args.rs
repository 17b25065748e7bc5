use clap::{Parser, Subcommand, ValueEnum};
use datasetplus_core::RepoKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "datasetplus")]
#[command(author, version, about = "Hugging Face dataset download and audio extraction")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a repository from the Hugging Face Hub
    Download {
        /// Repository id, e.g. fixie-ai/llama-questions
        repo_id: String,

        #[command(flatten)]
        options: DownloadOptions,
    },

    /// Summarize a parquet file without extracting anything
    Info {
        /// Parquet file
        parquet: PathBuf,

        /// Audio column to use instead of auto-detection
        #[arg(long)]
        audio_column: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the audio of each row of a parquet file to its own file
    Extract {
        /// Parquet file
        parquet: PathBuf,

        #[command(flatten)]
        options: ExtractOptions,
    },

    /// Download a dataset, summarize it and extract its audio
    Process {
        /// Repository id
        repo_id: String,

        #[command(flatten)]
        download: DownloadOptions,

        /// Parquet file to extract, relative to the download directory
        #[arg(long, default_value = "train.parquet")]
        parquet: PathBuf,

        /// Maximum rows to extract
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Column whose value names the extracted files
        #[arg(long)]
        id_column: Option<String>,
    },

    /// Show configuration
    Config,
}

#[derive(clap::Args, Clone)]
pub struct DownloadOptions {
    /// Download directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Repository type
    #[arg(long, value_enum)]
    pub repo_type: Option<RepoTypeArg>,

    /// Download only this file from the repository
    #[arg(long)]
    pub filename: Option<String>,

    /// Glob pattern of files to skip (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Branch, tag or commit
    #[arg(long)]
    pub revision: Option<String>,

    /// Remove the hub cache after downloading
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(clap::Args, Clone)]
pub struct ExtractOptions {
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum rows to extract
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Audio column to use instead of auto-detection
    #[arg(long)]
    pub audio_column: Option<String>,

    /// Column whose value names the extracted files
    #[arg(long)]
    pub id_column: Option<String>,

    /// Print the extraction result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepoTypeArg {
    /// Dataset repository
    Dataset,
    /// Model repository
    Model,
    /// Space repository
    Space,
}

impl From<RepoTypeArg> for RepoKind {
    fn from(arg: RepoTypeArg) -> Self {
        match arg {
            RepoTypeArg::Dataset => RepoKind::Dataset,
            RepoTypeArg::Model => RepoKind::Model,
            RepoTypeArg::Space => RepoKind::Space,
        }
    }
}
