//! Error types for datasetplus-core

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetPlusError>;

#[derive(Error, Debug)]
pub enum DatasetPlusError {
    #[error("Download failed: {0}")]
    Fetch(#[from] datasetplus_hub::RemoteFetchError),

    #[error("Unreadable source: {0}")]
    Source(#[from] SourceFormatError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The bound source is not readable as tabular audio data
#[derive(Error, Debug)]
pub enum SourceFormatError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a readable parquet file: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Failed to read record batch: {0}")]
    Arrow(#[from] ArrowError),

    #[error("No audio column found among: [{}]", .0.join(", "))]
    NoAudioColumn(Vec<String>),

    #[error("Audio column {0:?} not present in source")]
    MissingColumn(String),

    #[error("Column {name:?} of type {data_type} does not hold audio")]
    NotAudio { name: String, data_type: DataType },
}

/// Why a single row was skipped during extraction
#[derive(Error, Debug)]
pub enum RowError {
    #[error("audio value is null")]
    MissingPayload,

    #[error("audio payload is empty")]
    EmptyPayload,

    #[error("invalid sampling rate: {0}")]
    InvalidSampleRate(i64),

    #[error("unreadable audio value: {0}")]
    Unreadable(String),

    #[error("corrupt audio payload: {0}")]
    Corrupt(String),

    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}
