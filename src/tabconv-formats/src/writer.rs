use crate::avro::{write_avro, AvroWriteOptions};
use crate::coerce::apply_column_types;
use crate::csv::{write_csv, CsvWriteOptions};
use crate::error::Result;
use crate::format::DataFormat;
use crate::infer::infer_column_types;
use crate::json::{write_json, JsonWriteOptions};
use crate::parquet::{write_parquet, ParquetWriteOptions};
use crate::schema::{infer_schema, TableSchema};
use crate::xml::{write_xml, XmlWriteOptions};
use std::io::Write;
use tabconv_shared::RecordSet;

/// Options for writing data
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// CSV dialect and quoting
    pub csv: CsvWriteOptions,
    /// JSON layout
    pub json: JsonWriteOptions,
    /// XML layout
    pub xml: XmlWriteOptions,
    /// Parquet compression and row groups
    pub parquet: ParquetWriteOptions,
    /// Avro block codec
    pub avro: AvroWriteOptions,
}

/// Sink for a record set
pub trait DataWriter {
    /// Write every record
    fn write_records(&mut self, records: &RecordSet) -> Result<()>;

    /// Declared target format
    fn format(&self) -> DataFormat;
}

/// Run the binary write preparation: column inference, coercion, schema inference
///
/// Returns a coerced copy of the records together with their schema. Fails
/// when the record set is empty.
pub fn prepare_binary(records: &RecordSet) -> Result<(RecordSet, TableSchema)> {
    let column_types = infer_column_types(records);
    let mut typed = records.clone();
    apply_column_types(&mut typed, &column_types);
    let schema = infer_schema(&typed)?;
    Ok((typed, schema))
}

/// Encode `records` as `format`
pub fn serialize<W: Write + Send>(
    writer: W,
    records: &RecordSet,
    format: DataFormat,
    options: &WriteOptions,
) -> Result<()> {
    match format {
        DataFormat::Csv => write_csv(writer, records, &options.csv),
        DataFormat::Json => write_json(writer, records, &options.json),
        DataFormat::Xml => write_xml(writer, records, &options.xml),
        DataFormat::Parquet => {
            let (typed, schema) = prepare_binary(records)?;
            write_parquet(writer, &typed, &schema, &options.parquet)
        }
        DataFormat::Avro => {
            let (typed, schema) = prepare_binary(records)?;
            write_avro(writer, &typed, &schema, &options.avro)
        }
    }
}

/// Writer for in-memory output
pub struct MemoryWriter {
    buffer: Vec<u8>,
    format: DataFormat,
    options: WriteOptions,
}

impl MemoryWriter {
    /// Create a new memory writer
    pub fn new(format: DataFormat) -> Self {
        Self {
            buffer: Vec::new(),
            format,
            options: WriteOptions::default(),
        }
    }

    /// Set write options
    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the written data
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the written data
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

impl DataWriter for MemoryWriter {
    fn write_records(&mut self, records: &RecordSet) -> Result<()> {
        serialize(&mut self.buffer, records, self.format, &self.options)
    }

    fn format(&self) -> DataFormat {
        self.format
    }
}
