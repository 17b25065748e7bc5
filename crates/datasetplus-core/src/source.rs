//! Tabular sources the audio processor reads from

use crate::error::SourceFormatError;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder,
};
use parquet::arrow::ProjectionMask;
use parquet::file::metadata::ParquetMetaData;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Audio rows are large, keep batches small
const BATCH_SIZE: usize = 64;

const ARROW_SCHEMA_KEY: &str = "ARROW:schema";

pub type BatchIter<'a> = Box<dyn Iterator<Item = Result<RecordBatch, SourceFormatError>> + 'a>;

/// Row-ordered tabular data with schema introspection
pub trait TableSource: Sized {
    /// Open the source and read its schema without touching row data
    fn open(path: &Path) -> Result<Self, SourceFormatError>;

    fn schema(&self) -> SchemaRef;

    fn num_rows(&self) -> usize;

    /// File-level key/value metadata
    fn key_value_metadata(&self) -> HashMap<String, String>;

    /// Uncompressed bytes stored for a top-level column, if known
    fn column_uncompressed_size(&self, column: &str) -> Option<u64>;

    /// Iterate record batches in row order.
    ///
    /// `columns` restricts the read to those top-level column indices; batches
    /// then only carry the projected columns. `limit` caps the rows decoded.
    fn batches(
        &self,
        columns: Option<&[usize]>,
        limit: Option<usize>,
    ) -> Result<BatchIter<'_>, SourceFormatError>;
}

/// A parquet file read through the arrow reader
#[derive(Debug)]
pub struct ParquetTable {
    path: PathBuf,
    metadata: ArrowReaderMetadata,
}

impl ParquetTable {
    pub fn parquet_metadata(&self) -> &Arc<ParquetMetaData> {
        self.metadata.metadata()
    }

    fn open_file(&self) -> Result<File, SourceFormatError> {
        File::open(&self.path).map_err(|source| SourceFormatError::Open {
            path: self.path.clone(),
            source,
        })
    }
}

impl TableSource for ParquetTable {
    fn open(path: &Path) -> Result<Self, SourceFormatError> {
        let file = File::open(path).map_err(|source| SourceFormatError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::new())?;
        debug!(
            "Opened {} ({} row groups)",
            path.display(),
            metadata.metadata().num_row_groups()
        );

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
        })
    }

    fn schema(&self) -> SchemaRef {
        self.metadata.schema().clone()
    }

    fn num_rows(&self) -> usize {
        self.parquet_metadata().file_metadata().num_rows().max(0) as usize
    }

    fn key_value_metadata(&self) -> HashMap<String, String> {
        // Writers differ on whether schema metadata lands in the footer or only
        // inside the embedded arrow schema, so merge both
        let mut merged = self.metadata.schema().metadata().clone();

        if let Some(pairs) = self.parquet_metadata().file_metadata().key_value_metadata() {
            for kv in pairs {
                if kv.key == ARROW_SCHEMA_KEY {
                    continue;
                }
                if let Some(value) = &kv.value {
                    merged.insert(kv.key.clone(), value.clone());
                }
            }
        }

        merged
    }

    fn column_uncompressed_size(&self, column: &str) -> Option<u64> {
        let mut found = false;
        let mut total: u64 = 0;

        for row_group in self.parquet_metadata().row_groups() {
            for chunk in row_group.columns() {
                if chunk.column_path().parts().first().map(String::as_str) == Some(column) {
                    found = true;
                    total += chunk.uncompressed_size().max(0) as u64;
                }
            }
        }

        found.then_some(total)
    }

    fn batches(
        &self,
        columns: Option<&[usize]>,
        limit: Option<usize>,
    ) -> Result<BatchIter<'_>, SourceFormatError> {
        let file = self.open_file()?;
        let mut builder =
            ParquetRecordBatchReaderBuilder::new_with_metadata(file, self.metadata.clone())
                .with_batch_size(BATCH_SIZE);

        if let Some(columns) = columns {
            let mask = ProjectionMask::roots(builder.parquet_schema(), columns.iter().copied());
            builder = builder.with_projection(mask);
        }
        if let Some(limit) = limit {
            builder = builder.with_limit(limit);
        }

        let reader = builder.build()?;
        Ok(Box::new(reader.map(|batch| batch.map_err(SourceFormatError::from))))
    }
}
