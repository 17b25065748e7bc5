//! Output file naming and the JSON Lines metadata file

use crate::config::ExtractConfig;
use crate::encoder::AudioFormat;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Key of the output file name in every metadata entry
pub const FILE_NAME_KEY: &str = "file_name";

/// Key of the source row index in every metadata entry
pub const INDEX_KEY: &str = "index";

/// Sanitize a file stem: anything but ASCII letters and digits becomes `_`
pub fn sanitize_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Derives unique, deterministic output names for one extraction run
#[derive(Debug)]
pub struct FileNamer {
    prefix: String,
    width: usize,
    default_extension: String,
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            prefix: sanitize_stem(&config.filename_prefix),
            width: config.index_width,
            default_extension: config.default_extension.to_ascii_lowercase(),
            // the metadata file shares the output directory
            used: HashSet::from([config.metadata_file.clone()]),
        }
    }

    /// Name the file for row `index`.
    ///
    /// `stem_hint` comes from the id column and wins over `path_hint`; the
    /// extension comes from the path hint, then the payload, then the default.
    pub fn name(
        &mut self,
        index: usize,
        stem_hint: Option<&str>,
        path_hint: Option<&str>,
        payload: &[u8],
    ) -> String {
        let hinted_path = path_hint.map(Path::new);

        let extension = hinted_path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .or_else(|| AudioFormat::sniff(payload).map(|f| f.extension().to_string()))
            .unwrap_or_else(|| self.default_extension.clone());

        let stem = stem_hint
            .or_else(|| hinted_path.and_then(|p| p.file_stem()).and_then(|s| s.to_str()))
            .map(sanitize_stem)
            .filter(|s| s.chars().any(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| self.positional_stem(index));

        let mut candidate = format!("{}.{}", stem, extension);
        if self.used.contains(&candidate) {
            let base = format!("{}_{:0width$}", stem, index, width = self.width);
            candidate = format!("{}.{}", base, extension);
            let mut n = 1;
            while self.used.contains(&candidate) {
                candidate = format!("{}_{}.{}", base, n, extension);
                n += 1;
            }
        }

        self.used.insert(candidate.clone());
        candidate
    }

    fn positional_stem(&self, index: usize) -> String {
        format!("{}_{:0width$}", self.prefix, index, width = self.width)
    }
}

/// Build the metadata entry of one extracted row
pub fn entry(file_name: &str, index: usize, columns: Map<String, Value>) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert(FILE_NAME_KEY.to_string(), Value::from(file_name));
    entry.insert(INDEX_KEY.to_string(), Value::from(index));
    for (name, value) in columns {
        // reserved keys belong to the extraction
        if name != FILE_NAME_KEY && name != INDEX_KEY {
            entry.insert(name, value);
        }
    }
    entry
}

/// Append-only JSON Lines writer.
///
/// Each entry reaches the file in a single unbuffered write, so a failed
/// append never leaves half a line queued for the next one.
#[derive(Debug)]
pub struct MetadataWriter {
    path: PathBuf,
    file: File,
    entries: usize,
}

impl MetadataWriter {
    /// Create (or truncate) the metadata file
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            file,
            entries: 0,
        })
    }

    pub fn append(&mut self, entry: &Map<String, Value>) -> io::Result<()> {
        write_line(&mut self.file, entry)?;
        self.entries += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> usize {
        self.entries
    }
}

fn write_line(out: &mut impl Write, entry: &Map<String, Value>) -> io::Result<()> {
    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');
    out.write_all(&line)
}

/// Read a metadata file back into its entries
pub fn read_entries(path: &Path) -> io::Result<Vec<Map<String, Value>>> {
    let text = std::fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(io::Error::from))
        .collect()
}
