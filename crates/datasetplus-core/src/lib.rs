//! datasetplus-core: Hugging Face dataset download and parquet audio extraction

pub mod column;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fetcher;
pub mod metadata;
pub mod processor;
pub mod report;
pub mod source;

pub use config::Config;
pub use error::{DatasetPlusError, Result, RowError, SourceFormatError};
pub use fetcher::DatasetFetcher;
pub use processor::{AudioProcessor, DatasetSummary, ExtractionResult, SkippedRow};
pub use report::{Reporter, RowOutcome, SilentReporter, TracingReporter};
pub use source::{ParquetTable, TableSource};

pub use datasetplus_hub::{RemoteFetchError, RepoKind};
