use crate::error::{Error, Result};
use crate::format::DataFormat;
use std::io::{Read, Write};
use tabconv_shared::{Record, RecordSet, Value};

/// CSV-specific reading options
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Field separator character
    pub separator: u8,
    /// Quote character for fields containing separators or newlines
    pub quote_char: u8,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            quote_char: b'"',
        }
    }
}

/// CSV-specific writing options
#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    /// Field separator character
    pub separator: u8,
    /// Quote character for fields
    pub quote_char: u8,
    /// When to quote fields
    pub quote_style: QuoteStyle,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            quote_char: b'"',
            quote_style: QuoteStyle::Necessary,
        }
    }
}

/// Quoting strategy for CSV output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Always quote all fields
    Always,
    /// Quote only when necessary (fields containing separator, quote, or newline)
    #[default]
    Necessary,
    /// Never quote fields (may produce invalid CSV)
    Never,
}

impl From<QuoteStyle> for csv::QuoteStyle {
    fn from(style: QuoteStyle) -> Self {
        match style {
            QuoteStyle::Always => csv::QuoteStyle::Always,
            QuoteStyle::Necessary => csv::QuoteStyle::Necessary,
            QuoteStyle::Never => csv::QuoteStyle::Never,
        }
    }
}

impl std::str::FromStr for QuoteStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(QuoteStyle::Always),
            "necessary" => Ok(QuoteStyle::Necessary),
            "never" => Ok(QuoteStyle::Never),
            _ => Err(format!("unknown quote style: {s}")),
        }
    }
}

/// CSV reader producing string-valued records
pub struct CsvReader<R> {
    reader: R,
    options: CsvReadOptions,
}

impl<R: Read> CsvReader<R> {
    /// Create a new CSV reader with default options
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            options: CsvReadOptions::default(),
        }
    }

    /// Create a CSV reader with custom options
    pub fn with_options(reader: R, options: CsvReadOptions) -> Self {
        Self { reader, options }
    }

    /// Set the field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.options.separator = separator;
        self
    }

    /// Set the quote character
    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.options.quote_char = quote_char;
        self
    }

    /// Read every row into a record set
    ///
    /// The first row is the header. Short rows are padded with empty strings
    /// and cells beyond the header are ignored. An empty or header-only input
    /// yields an empty set.
    pub fn read_records(self) -> Result<RecordSet> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.options.separator)
            .quote(self.options.quote_char)
            .has_headers(true)
            .flexible(true)
            .from_reader(self.reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Ok(RecordSet::new());
        }

        let mut records = RecordSet::new();
        for row in csv_reader.records() {
            let row = row?;
            let record: Record = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), Value::string(row.get(i).unwrap_or(""))))
                .collect();
            records.push(record);
        }

        Ok(records)
    }
}

/// CSV writer emitting the first record's keys as header
pub struct CsvWriter<W> {
    writer: W,
    options: CsvWriteOptions,
}

impl<W: Write> CsvWriter<W> {
    /// Create a new CSV writer with default options
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            options: CsvWriteOptions::default(),
        }
    }

    /// Create a CSV writer with custom options
    pub fn with_options(writer: W, options: CsvWriteOptions) -> Self {
        Self { writer, options }
    }

    /// Set the quote style
    pub fn with_quote_style(mut self, quote_style: QuoteStyle) -> Self {
        self.options.quote_style = quote_style;
        self
    }

    /// Write the header row followed by one row per record
    pub fn write_records(self, records: &RecordSet) -> Result<()> {
        if records.is_empty() {
            return Err(Error::EmptyRecordSet {
                format: DataFormat::Csv,
            });
        }

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.options.separator)
            .quote(self.options.quote_char)
            .quote_style(self.options.quote_style.into())
            .from_writer(self.writer);

        let header = records.first_record_keys();
        csv_writer.write_record(&header).map_err(encode_error)?;

        for record in records {
            let row = header
                .iter()
                .map(|column| record.get(column).map(Value::to_text).unwrap_or_default());
            csv_writer.write_record(row).map_err(encode_error)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

fn encode_error(e: csv::Error) -> Error {
    Error::encode(DataFormat::Csv, e)
}

/// Read CSV bytes with the given options
pub fn read_csv(bytes: &[u8], options: &CsvReadOptions) -> Result<RecordSet> {
    CsvReader::with_options(bytes, options.clone()).read_records()
}

/// Write a record set as CSV
pub fn write_csv<W: Write>(writer: W, records: &RecordSet, options: &CsvWriteOptions) -> Result<()> {
    CsvWriter::with_options(writer, options.clone()).write_records(records)
}
