use crate::avro::read_avro;
use crate::csv::{read_csv, CsvReadOptions};
use crate::error::{Error, Result};
use crate::format::DataFormat;
use crate::json::read_json;
use crate::parquet::read_parquet;
use crate::scratch::Scratch;
use crate::xml::read_xml;
use std::path::{Path, PathBuf};
use tabconv_shared::RecordSet;

/// Options for reading data
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// CSV dialect
    pub csv: CsvReadOptions,
}

/// Source of a record set
pub trait DataReader {
    /// Read every record
    fn read_records(&mut self) -> Result<RecordSet>;

    /// Declared source format
    fn format(&self) -> DataFormat;
}

/// Decode `input` as `format`
///
/// Empty or whitespace-only input is [`Error::EmptyInput`], except for CSV
/// where it is an empty record set.
pub fn deserialize(
    input: Vec<u8>,
    format: DataFormat,
    options: &ReadOptions,
    scratch: &Scratch,
) -> Result<RecordSet> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return if format.accepts_empty_input() {
            Ok(RecordSet::new())
        } else {
            Err(Error::EmptyInput { format })
        };
    }

    match format {
        DataFormat::Csv => read_csv(&input, &options.csv),
        DataFormat::Json => read_json(&input),
        DataFormat::Xml => read_xml(&input),
        DataFormat::Parquet => read_parquet(scratch.spool(input)?),
        DataFormat::Avro => read_avro(&input),
    }
}

/// Reader for in-memory data
pub struct MemoryReader {
    data: Vec<u8>,
    format: DataFormat,
    options: ReadOptions,
    scratch: Scratch,
}

impl MemoryReader {
    /// Create a new memory reader
    pub fn new(data: Vec<u8>, format: DataFormat) -> Self {
        Self {
            data,
            format,
            options: ReadOptions::default(),
            scratch: Scratch::in_memory(),
        }
    }

    /// Set read options
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Set scratch storage for binary inputs
    pub fn with_scratch(mut self, scratch: Scratch) -> Self {
        self.scratch = scratch;
        self
    }
}

impl DataReader for MemoryReader {
    /// Consumes the buffered input; a second call sees empty input
    fn read_records(&mut self) -> Result<RecordSet> {
        let data = std::mem::take(&mut self.data);
        deserialize(data, self.format, &self.options, &self.scratch)
    }

    fn format(&self) -> DataFormat {
        self.format
    }
}

/// Reader for a file on disk
pub struct FileReader {
    path: PathBuf,
    format: DataFormat,
    options: ReadOptions,
    scratch: Scratch,
}

impl FileReader {
    /// Create a reader, detecting the format from the file extension
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = DataFormat::from_path(&path)?;
        Ok(Self::with_format(path, format))
    }

    /// Create a reader with an explicit format
    pub fn with_format<P: AsRef<Path>>(path: P, format: DataFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            options: ReadOptions::default(),
            scratch: Scratch::in_memory(),
        }
    }

    /// Set read options
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Set scratch storage for binary inputs
    pub fn with_scratch(mut self, scratch: Scratch) -> Self {
        self.scratch = scratch;
        self
    }

    /// Path being read
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataReader for FileReader {
    fn read_records(&mut self) -> Result<RecordSet> {
        let data = std::fs::read(&self.path)?;
        deserialize(data, self.format, &self.options, &self.scratch)
    }

    fn format(&self) -> DataFormat {
        self.format
    }
}
