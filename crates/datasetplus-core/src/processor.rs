//! Audio extraction from a tabular source
//!
//! [`AudioProcessor`] is bound to one source path. The source is opened on
//! first use and kept for later calls. Extraction isolates failures per row: a
//! row that cannot be read or written is recorded in
//! [`ExtractionResult::skipped`] and the run carries on with the next row.

use crate::column::{
    cell_to_json, find_audio_column, read_payload, AudioColumn, AudioLayout, ColumnKind,
    FeatureHints,
};
use crate::config::ExtractConfig;
use crate::error::{Result, RowError, SourceFormatError};
use crate::metadata::{self, FileNamer, MetadataWriter};
use crate::report::{Reporter, RowOutcome, TracingReporter};
use crate::source::{ParquetTable, TableSource};
use arrow::array::ArrayRef;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Schema-level description of a source
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub path: PathBuf,
    pub num_rows: usize,
    pub columns: Vec<ColumnSummary>,
    pub audio_column: String,
    pub audio_layout: &'static str,
    /// Declared in the `datasets` feature description, if any
    pub sampling_rate: Option<u32>,
    /// Uncompressed size of the audio column
    pub audio_bytes: Option<u64>,
    pub audio_size_mb: Option<f64>,
    /// First rows, scalar columns only
    pub sample: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: String,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedFile {
    pub index: usize,
    pub file_name: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub index: usize,
    pub reason: String,
}

/// Outcome of one extraction run
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub output_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub attempted: usize,
    pub succeeded: usize,
    /// Written files in row order
    pub files: Vec<ExtractedFile>,
    pub skipped: Vec<SkippedRow>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn failed(&self) -> usize {
        self.skipped.len()
    }

    pub fn failure_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failed() as f64 / self.attempted as f64
        }
    }
}

struct OpenSource<S> {
    table: S,
    audio: AudioColumn,
    hints: FeatureHints,
}

/// Reads audio rows out of one tabular source
pub struct AudioProcessor<S: TableSource = ParquetTable> {
    path: PathBuf,
    options: ExtractConfig,
    reporter: Box<dyn Reporter>,
    source: Option<OpenSource<S>>,
}

impl AudioProcessor<ParquetTable> {
    /// Bind a parquet file. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_table(path)
    }
}

impl<S: TableSource> AudioProcessor<S> {
    /// Bind a path read through the given [`TableSource`]
    pub fn with_table(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: ExtractConfig::default(),
            reporter: Box::new(TracingReporter),
            source: None,
        }
    }

    pub fn with_options(mut self, options: ExtractConfig) -> Self {
        self.options = options;
        // column selection may have changed
        self.source = None;
        self
    }

    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Describe the source from its footer without reading audio payloads
    pub fn get_metadata(&mut self) -> std::result::Result<DatasetSummary, SourceFormatError> {
        let reporter = self.reporter.as_ref();
        let source = open_source(&mut self.source, &self.path, &self.options, reporter)?;

        let schema = source.table.schema();
        let columns = schema
            .fields()
            .iter()
            .map(|field| ColumnSummary {
                name: field.name().clone(),
                data_type: field.data_type().to_string(),
                kind: ColumnKind::of(field.data_type()).name(),
            })
            .collect();

        let audio_bytes = source.table.column_uncompressed_size(&source.audio.name);
        let sample = read_sample(&source.table, &schema, self.options.sample_rows)
            .unwrap_or_else(|e| {
                reporter.warn(&format!("Could not read sample rows: {}", e));
                Vec::new()
            });

        Ok(DatasetSummary {
            path: self.path.clone(),
            num_rows: source.table.num_rows(),
            columns,
            audio_column: source.audio.name.clone(),
            audio_layout: source.audio.layout.describe(),
            sampling_rate: source.hints.sampling_rate(&source.audio.name),
            audio_bytes,
            audio_size_mb: audio_bytes.map(|b| b as f64 / (1024.0 * 1024.0)),
            sample,
        })
    }

    /// Write the audio of up to `limit` rows into `output_dir`, with one
    /// metadata line per written file
    pub fn extract_audio_files(
        &mut self,
        output_dir: &Path,
        limit: Option<usize>,
    ) -> Result<ExtractionResult> {
        let started_at = Utc::now();
        fs::create_dir_all(output_dir)?;

        let reporter = self.reporter.as_ref();
        let options = &self.options;
        let source = open_source(&mut self.source, &self.path, options, reporter)?;

        let total = source.table.num_rows();
        let planned = limit.map_or(total, |limit| limit.min(total));
        let mut metadata = MetadataWriter::create(output_dir.join(&options.metadata_file))?;

        let schema = source.table.schema();
        let plan = RowPlan::new(&schema, &source.audio, options, reporter);
        let mut namer = FileNamer::new(options);

        let mut files = Vec::new();
        let mut skipped = Vec::new();
        let mut attempted = 0;

        reporter.info(&format!(
            "Extracting {} of {} rows from {:?} into {}",
            planned,
            total,
            source.audio.name,
            output_dir.display()
        ));
        reporter.extraction_started(planned);

        let abort = |e: SourceFormatError, attempted: usize| {
            reporter.error(&format!("Aborting after {} rows: {}", attempted, e));
            e
        };

        if planned > 0 {
            let batches = source
                .table
                .batches(None, Some(planned))
                .map_err(|e| abort(e, attempted))?;
            for batch in batches {
                let batch = batch.map_err(|e| abort(e, attempted))?;
                let audio = batch.column(source.audio.index);

                for row in 0..batch.num_rows() {
                    if attempted == planned {
                        break;
                    }
                    let index = attempted;
                    attempted += 1;

                    let written = plan.write_row(
                        output_dir,
                        &batch,
                        audio,
                        row,
                        index,
                        &mut namer,
                        &mut metadata,
                    );
                    match written {
                        Ok(file) => {
                            reporter.row_finished(
                                index,
                                &RowOutcome::Written {
                                    file_name: &file.file_name,
                                    bytes: file.bytes,
                                },
                            );
                            files.push(file);
                        }
                        Err(reason) => {
                            reporter.warn(&format!("Skipping row {}: {}", index, reason));
                            reporter.row_finished(index, &RowOutcome::Skipped { reason: &reason });
                            skipped.push(SkippedRow {
                                index,
                                reason: reason.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let result = ExtractionResult {
            output_dir: output_dir.to_path_buf(),
            metadata_path: metadata.path().to_path_buf(),
            attempted,
            succeeded: files.len(),
            files,
            skipped,
            started_at,
            finished_at: Utc::now(),
        };

        reporter.info(&format!(
            "Extracted {}/{} rows ({} skipped), {} entries in {}",
            result.succeeded,
            result.attempted,
            result.failed(),
            metadata.entries(),
            result.metadata_path.display()
        ));
        Ok(result)
    }
}

fn open_source<'a, S: TableSource>(
    slot: &'a mut Option<OpenSource<S>>,
    path: &Path,
    options: &ExtractConfig,
    reporter: &dyn Reporter,
) -> std::result::Result<&'a OpenSource<S>, SourceFormatError> {
    let source = match slot.take() {
        Some(source) => source,
        None => {
            let table = S::open(path)?;
            let hints = FeatureHints::from_metadata(&table.key_value_metadata());
            let audio = find_audio_column(
                &table.schema(),
                &hints,
                options.audio_column.as_deref(),
            )?;
            reporter.info(&format!(
                "Opened {} ({} rows, audio column {:?}, {})",
                path.display(),
                table.num_rows(),
                audio.name,
                audio.layout.describe()
            ));
            OpenSource {
                table,
                audio,
                hints,
            }
        }
    };
    Ok(slot.insert(source))
}

fn read_sample<S: TableSource>(
    table: &S,
    schema: &Schema,
    rows: usize,
) -> std::result::Result<Vec<Map<String, Value>>, SourceFormatError> {
    let scalar: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| ColumnKind::of(f.data_type()) == ColumnKind::Scalar)
        .map(|(i, _)| i)
        .collect();
    if rows == 0 || scalar.is_empty() {
        return Ok(Vec::new());
    }

    let mut sample = Vec::with_capacity(rows);
    for batch in table.batches(Some(scalar.as_slice()), Some(rows))? {
        let batch = batch?;
        let names = batch.schema();
        for row in 0..batch.num_rows() {
            let mut entry = Map::new();
            for (field, column) in names.fields().iter().zip(batch.columns()) {
                entry.insert(field.name().clone(), cell_to_json(column, row));
            }
            sample.push(entry);
        }
    }
    sample.truncate(rows);
    Ok(sample)
}

/// Which columns feed naming and metadata
struct RowPlan {
    layout: AudioLayout,
    id_column: Option<usize>,
    metadata_columns: Vec<(String, usize)>,
}

impl RowPlan {
    fn new(
        schema: &Schema,
        audio: &AudioColumn,
        options: &ExtractConfig,
        reporter: &dyn Reporter,
    ) -> Self {
        let id_column = options.id_column.as_deref().and_then(|name| {
            let found = schema.index_of(name).ok();
            if found.is_none() {
                reporter.warn(&format!(
                    "Id column {:?} not found, naming files by row index",
                    name
                ));
            }
            found
        });

        // audio payloads never go into the metadata file
        let metadata_columns = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !ColumnKind::of(f.data_type()).is_audio())
            .map(|(i, f)| (f.name().clone(), i))
            .collect();

        Self {
            layout: audio.layout,
            id_column,
            metadata_columns,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_row(
        &self,
        output_dir: &Path,
        batch: &RecordBatch,
        audio: &ArrayRef,
        row: usize,
        index: usize,
        namer: &mut FileNamer,
        metadata: &mut MetadataWriter,
    ) -> std::result::Result<ExtractedFile, RowError> {
        let payload = read_payload(audio, self.layout, row)?;

        let stem = self
            .id_column
            .and_then(|i| match cell_to_json(batch.column(i), row) {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            });
        let file_name = namer.name(
            index,
            stem.as_deref(),
            payload.path_hint.as_deref(),
            &payload.bytes,
        );
        let target = output_dir.join(&file_name);

        let mut tmp = NamedTempFile::new_in(output_dir)?;
        tmp.write_all(&payload.bytes)?;
        tmp.as_file().sync_all()?;
        // a failed persist drops the temp file, which removes it
        tmp.persist(&target).map_err(|e| e.error)?;
        debug!("Wrote {} ({} bytes)", target.display(), payload.bytes.len());

        let columns = self
            .metadata_columns
            .iter()
            .map(|(name, i)| (name.clone(), cell_to_json(batch.column(*i), row)))
            .collect();
        let entry = metadata::entry(&file_name, index, columns);

        if let Err(e) = metadata.append(&entry) {
            // no entry, no file
            let _ = fs::remove_file(&target);
            return Err(RowError::Write(e));
        }

        Ok(ExtractedFile {
            index,
            file_name,
            bytes: payload.bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetPlusError;
    use crate::metadata::{read_entries, FILE_NAME_KEY, INDEX_KEY};
    use crate::report::SilentReporter;
    use crate::source::testing::{audio_struct, flac_bytes, speech_table, wav_bytes, write_parquet};
    use crate::source::BatchIter;
    use arrow::array::{BinaryArray, Int64Array, StringArray};
    use arrow::datatypes::SchemaRef;
    use arrow::error::ArrowError;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::sync::Arc;

    fn processor(path: &Path) -> AudioProcessor {
        AudioProcessor::new(path).with_reporter(SilentReporter)
    }

    fn audio_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".wav") || name.ends_with(".flac"))
            .collect();
        names.sort();
        names
    }

    /// Ten rows where row 3 has no audio
    fn table_with_bad_row(path: &Path) {
        let payloads: Vec<Option<Vec<u8>>> = (0..10)
            .map(|i| (i != 3).then(|| wav_bytes(32, 16_000)))
            .collect();
        let texts: StringArray = (0..10).map(|i| Some(format!("row {}", i))).collect();
        let scores = Int64Array::from((0..10).collect::<Vec<i64>>());

        write_parquet(
            path,
            vec![
                ("text", Arc::new(texts) as ArrayRef),
                ("score", Arc::new(scores) as ArrayRef),
                ("audio", audio_struct(&payloads, &[None; 10])),
            ],
            None,
        );
    }

    #[test]
    fn test_bad_row_is_skipped_and_the_rest_written() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        table_with_bad_row(&parquet);
        let out = tmp.path().join("audio_files");

        let result = processor(&parquet).extract_audio_files(&out, None).unwrap();

        assert_eq!(result.attempted, 10);
        assert_eq!(result.succeeded, 9);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].index, 3);
        assert_eq!(audio_files(&out).len(), 9);

        let entries = read_entries(&result.metadata_path).unwrap();
        assert_eq!(entries.len(), 9);
        assert!(entries.iter().all(|e| e[INDEX_KEY] != Value::from(3)));

        // every entry points at a file and carries the source columns
        for entry in &entries {
            let name = entry[FILE_NAME_KEY].as_str().unwrap();
            assert!(out.join(name).is_file());
            assert!(entry.contains_key("text"));
            assert!(entry.contains_key("score"));
            assert!(!entry.contains_key("audio"));
        }
        assert_eq!(entries[3]["text"], Value::from("row 4"));
    }

    #[test]
    fn test_corrupt_payload_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        let payloads: Vec<Option<Vec<u8>>> = (0..10)
            .map(|i| match i {
                3 => Some(b"RIFF\xff\xff\xff\xffWAVEtruncated-garbage".to_vec()),
                _ => Some(wav_bytes(32, 16_000)),
            })
            .collect();
        write_parquet(
            &parquet,
            vec![("audio", audio_struct(&payloads, &[None; 10]))],
            None,
        );
        let out = tmp.path().join("out");

        let result = processor(&parquet).extract_audio_files(&out, None).unwrap();

        assert_eq!(result.attempted, 10);
        assert_eq!(result.succeeded, 9);
        assert_eq!(result.skipped[0].index, 3);
        assert!(result.skipped[0].reason.starts_with("corrupt audio payload"));
        assert!(!out.join("audio_00003.wav").exists());

        let entries = read_entries(&result.metadata_path).unwrap();
        assert_eq!(entries.len(), 9);
        assert!(entries.iter().all(|e| e[INDEX_KEY] != Value::from(3)));
    }

    #[test]
    fn test_audio_named_like_metadata_file_is_renamed() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        let payloads: Vec<Option<Vec<u8>>> = (0..3).map(|_| Some(wav_bytes(8, 16_000))).collect();
        write_parquet(
            &parquet,
            vec![(
                "audio",
                audio_struct(
                    &payloads,
                    &[Some("a.wav"), Some("clips/metadata.jsonl"), Some("b.wav")],
                ),
            )],
            None,
        );
        let out = tmp.path().join("out");

        let result = processor(&parquet).extract_audio_files(&out, None).unwrap();
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.files[1].file_name, "metadata_00001.jsonl");

        let entries = read_entries(&result.metadata_path).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e[FILE_NAME_KEY] != Value::from("metadata.jsonl")));
    }

    #[test]
    fn test_written_bytes_match_source() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 3);
        let out = tmp.path().join("out");

        let result = processor(&parquet).extract_audio_files(&out, None).unwrap();
        assert_eq!(result.succeeded, 3);

        let written = fs::read(out.join("audio_00002.wav")).unwrap();
        assert_eq!(written, wav_bytes(18, 16_000));
        assert_eq!(result.files[2].bytes, written.len());
    }

    #[test]
    fn test_limit_zero_is_empty_and_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 4);
        let out = tmp.path().join("out");

        let result = processor(&parquet).extract_audio_files(&out, Some(0)).unwrap();
        assert_eq!(result.attempted, 0);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failure_rate(), 0.0);
        assert!(audio_files(&out).is_empty());
        assert!(read_entries(&result.metadata_path).unwrap().is_empty());
    }

    #[test]
    fn test_limit_bounds_attempted_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 10);

        let result = processor(&parquet)
            .extract_audio_files(&tmp.path().join("a"), Some(5))
            .unwrap();
        assert_eq!(result.attempted, 5);
        assert_eq!(audio_files(&tmp.path().join("a")).len(), 5);

        // a limit past the end is capped by the row count
        let result = processor(&parquet)
            .extract_audio_files(&tmp.path().join("b"), Some(50))
            .unwrap();
        assert_eq!(result.attempted, 10);
    }

    #[test]
    fn test_names_are_deterministic_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 6);
        let out = tmp.path().join("out");

        let mut processor = processor(&parquet);
        let first = processor.extract_audio_files(&out, None).unwrap();
        let second = processor.extract_audio_files(&out, None).unwrap();

        let names = |r: &ExtractionResult| {
            r.files.iter().map(|f| f.file_name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first)[0], "audio_00000.wav");

        // the second run overwrote in place and truncated the metadata file
        assert_eq!(audio_files(&out).len(), 6);
        assert_eq!(read_entries(&second.metadata_path).unwrap().len(), 6);
    }

    #[test]
    fn test_get_metadata_summarizes_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 8);

        let before: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        let summary = processor(&parquet).get_metadata().unwrap();
        let after: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(before.len(), after.len());

        assert_eq!(summary.num_rows, 8);
        assert_eq!(summary.audio_column, "audio");
        assert_eq!(summary.audio_layout, "encoded");
        assert_eq!(summary.columns.len(), 3);
        assert_eq!(summary.columns[2].kind, "audio");
        assert!(summary.audio_bytes.unwrap() > 0);

        assert_eq!(summary.sample.len(), 5);
        assert_eq!(summary.sample[1]["id"], Value::from("q1"));
        assert!(!summary.sample[0].contains_key("audio"));
    }

    #[test]
    fn test_get_metadata_reads_declared_sampling_rate() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        let mut kv = HashMap::new();
        kv.insert(
            "huggingface".to_string(),
            r#"{"info": {"features": {"speech": {"sampling_rate": 24000, "_type": "Audio"}}}}"#
                .to_string(),
        );
        let raw: ArrayRef = Arc::new(BinaryArray::from_vec(vec![b"x".as_slice()]));
        let speech = audio_struct(&[Some(wav_bytes(4, 24_000))], &[None]);
        write_parquet(&parquet, vec![("raw", raw), ("speech", speech)], Some(kv));

        let summary = processor(&parquet).get_metadata().unwrap();
        assert_eq!(summary.audio_column, "speech");
        assert_eq!(summary.sampling_rate, Some(24_000));
    }

    #[test]
    fn test_missing_audio_column_is_a_source_error() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("text.parquet");
        let text: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        write_parquet(&parquet, vec![("text", text)], None);

        let mut processor = processor(&parquet);
        assert!(matches!(
            processor.get_metadata(),
            Err(SourceFormatError::NoAudioColumn(_))
        ));

        let out = tmp.path().join("out");
        let err = processor.extract_audio_files(&out, None).unwrap_err();
        assert!(matches!(err, DatasetPlusError::Source(_)));
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = processor(&tmp.path().join("missing.parquet"))
            .extract_audio_files(&tmp.path().join("out"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            DatasetPlusError::Source(SourceFormatError::Open { .. })
        ));
    }

    #[test]
    fn test_uncreatable_output_dir_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 2);
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();

        let err = processor(&parquet)
            .extract_audio_files(&blocker.join("out"), None)
            .unwrap_err();
        assert!(matches!(err, DatasetPlusError::Io(_)));
    }

    #[test]
    fn test_id_column_and_path_hints_name_files() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 3);

        let options = ExtractConfig {
            id_column: Some("id".to_string()),
            ..Default::default()
        };
        let out = tmp.path().join("by_id");
        let result = processor(&parquet)
            .with_options(options)
            .extract_audio_files(&out, None)
            .unwrap();
        assert_eq!(audio_files(&out), vec!["q0.wav", "q1.wav", "q2.wav"]);
        assert_eq!(result.files[1].file_name, "q1.wav");

        let hinted = tmp.path().join("hinted.parquet");
        let payloads = vec![Some(flac_bytes()), Some(wav_bytes(4, 8_000))];
        write_parquet(
            &hinted,
            vec![(
                "audio",
                audio_struct(&payloads, &[Some("clips/first.flac"), Some("clips/first.flac")]),
            )],
            None,
        );
        let out = tmp.path().join("by_path");
        let result = processor(&hinted).extract_audio_files(&out, None).unwrap();
        let names: Vec<_> = result.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["first.flac", "first_00001.flac"]);
    }

    #[test]
    fn test_raw_binary_column() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("raw.parquet");
        let wav = wav_bytes(8, 8_000);
        let raw: ArrayRef = Arc::new(BinaryArray::from_vec(vec![wav.as_slice(), b"".as_slice()]));
        write_parquet(&parquet, vec![("blob", raw)], None);

        let out = tmp.path().join("out");
        let result = processor(&parquet).extract_audio_files(&out, None).unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.skipped[0].index, 1);
        assert_eq!(result.skipped[0].reason, RowError::EmptyPayload.to_string());
    }

    #[test]
    fn test_write_failure_is_row_local() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 4);
        let out = tmp.path().join("out");
        // a directory squatting on the target name makes the rename fail
        fs::create_dir_all(out.join("q2.wav")).unwrap();

        let options = ExtractConfig {
            id_column: Some("id".to_string()),
            ..Default::default()
        };
        let result = processor(&parquet)
            .with_options(options)
            .extract_audio_files(&out, None)
            .unwrap();

        assert_eq!(result.attempted, 4);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.skipped[0].index, 2);

        let entries = read_entries(&result.metadata_path).unwrap();
        assert_eq!(entries.len(), 3);
        // no temp files left behind
        let leftovers = fs::read_dir(&out)
            .unwrap()
            .filter(|e| {
                let name = e.as_ref().unwrap().file_name();
                name.to_string_lossy().starts_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[derive(Clone, Default)]
    struct Recording(Rc<RefCell<Vec<String>>>);

    impl Reporter for Recording {
        fn info(&self, _message: &str) {}
        fn warn(&self, message: &str) {
            self.0.borrow_mut().push(format!("warn {}", message));
        }
        fn error(&self, message: &str) {
            self.0.borrow_mut().push(format!("error {}", message));
        }
        fn extraction_started(&self, planned: usize) {
            self.0.borrow_mut().push(format!("start {}", planned));
        }
        fn row_finished(&self, index: usize, outcome: &RowOutcome<'_>) {
            let tag = match outcome {
                RowOutcome::Written { .. } => "ok",
                RowOutcome::Skipped { .. } => "skip",
            };
            self.0.borrow_mut().push(format!("{} {}", tag, index));
        }
    }

    #[test]
    fn test_reporter_sees_every_row() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        table_with_bad_row(&parquet);

        let recording = Recording::default();
        let result = AudioProcessor::new(&parquet)
            .with_reporter(recording.clone())
            .extract_audio_files(&tmp.path().join("out"), Some(5))
            .unwrap();
        assert_eq!(result.attempted, 5);

        let events = recording.0.borrow();
        assert_eq!(events[0], "start 5");
        assert!(events.iter().any(|e| e.starts_with("warn Skipping row 3")));
        assert!(events.contains(&"skip 3".to_string()));
        assert_eq!(events.iter().filter(|e| e.starts_with("ok ")).count(), 4);
    }

    thread_local! {
        static OPENS: Cell<usize> = Cell::new(0);
    }

    /// Parquet table that counts opens and can break after its first batch
    struct Instrumented {
        inner: ParquetTable,
        break_after_first: bool,
    }

    impl Instrumented {
        fn wrap(
            path: &Path,
            break_after_first: bool,
        ) -> std::result::Result<Self, SourceFormatError> {
            OPENS.with(|n| n.set(n.get() + 1));
            Ok(Self {
                inner: ParquetTable::open(path)?,
                break_after_first,
            })
        }
    }

    /// Opens are counted
    struct Counted(Instrumented);

    /// Second batch fails to decode
    struct Breaking(Instrumented);

    macro_rules! delegate_table {
        ($name:ident, $broken:expr) => {
            impl TableSource for $name {
                fn open(path: &Path) -> std::result::Result<Self, SourceFormatError> {
                    Instrumented::wrap(path, $broken).map($name)
                }
                fn schema(&self) -> SchemaRef {
                    self.0.inner.schema()
                }
                fn num_rows(&self) -> usize {
                    self.0.inner.num_rows()
                }
                fn key_value_metadata(&self) -> HashMap<String, String> {
                    self.0.inner.key_value_metadata()
                }
                fn column_uncompressed_size(&self, column: &str) -> Option<u64> {
                    self.0.inner.column_uncompressed_size(column)
                }
                fn batches(
                    &self,
                    columns: Option<&[usize]>,
                    limit: Option<usize>,
                ) -> std::result::Result<BatchIter<'_>, SourceFormatError> {
                    let batches = self.0.inner.batches(columns, limit)?;
                    if !self.0.break_after_first {
                        return Ok(batches);
                    }
                    let failure = SourceFormatError::Arrow(ArrowError::ParseError(
                        "page checksum mismatch".to_string(),
                    ));
                    Ok(Box::new(batches.take(1).chain(std::iter::once(Err(failure)))))
                }
            }
        };
    }

    delegate_table!(Counted, false);
    delegate_table!(Breaking, true);

    #[test]
    fn test_source_is_opened_once_across_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        speech_table(&parquet, 4);
        OPENS.with(|n| n.set(0));

        let mut processor =
            AudioProcessor::<Counted>::with_table(&parquet).with_reporter(SilentReporter);
        let summary = processor.get_metadata().unwrap();
        let result = processor
            .extract_audio_files(&tmp.path().join("out"), None)
            .unwrap();

        assert_eq!(summary.num_rows, 4);
        assert_eq!(result.succeeded, 4);
        assert_eq!(processor.path(), parquet.as_path());
        assert_eq!(OPENS.with(Cell::get), 1);
    }

    #[test]
    fn test_mid_stream_read_failure_is_reported_and_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let parquet = tmp.path().join("train.parquet");
        // more rows than one batch holds
        speech_table(&parquet, 100);

        let recording = Recording::default();
        let err = AudioProcessor::<Breaking>::with_table(&parquet)
            .with_reporter(recording.clone())
            .extract_audio_files(&tmp.path().join("out"), None)
            .unwrap_err();
        assert!(matches!(err, DatasetPlusError::Source(SourceFormatError::Arrow(_))));

        let events = recording.0.borrow();
        let last = events.last().unwrap();
        assert!(last.starts_with("error Aborting after 64 rows"), "{}", last);
        assert_eq!(events.iter().filter(|e| e.starts_with("ok ")).count(), 64);
    }
}
