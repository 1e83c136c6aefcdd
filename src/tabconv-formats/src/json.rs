use crate::error::{Error, FormatError, Result};
use crate::format::DataFormat;
use serde_json::Value as JsonValue;
use std::io::{Read, Write};
use tabconv_shared::{Record, RecordSet, Value};

/// JSON-specific writing options
#[derive(Debug, Clone)]
pub struct JsonWriteOptions {
    /// Whether to pretty-print the JSON
    pub pretty: bool,
}

impl Default for JsonWriteOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// JSON reader accepting an array of objects or a single object
pub struct JsonReader<R> {
    reader: R,
}

impl<R: Read> JsonReader<R> {
    /// Create a new JSON reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Parse the whole document into a record set
    pub fn read_records(self) -> Result<RecordSet> {
        let document: JsonValue = serde_json::from_reader(self.reader)?;
        records_from_json(document)
    }
}

/// Turn a parsed document into records, keeping key order and native scalars
pub fn records_from_json(document: JsonValue) -> Result<RecordSet> {
    match document {
        JsonValue::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                JsonValue::Object(map) => Ok(record_from_object(map)),
                other => Err(shape_error(format!(
                    "array element {index} is {}, expected an object",
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Vec<Record>>>()
            .map(RecordSet::from_records),
        JsonValue::Object(map) => Ok(RecordSet::from_records(vec![record_from_object(map)])),
        other => Err(shape_error(format!(
            "top-level value is {}, expected an array of objects or an object",
            json_kind(&other)
        ))),
    }
}

fn record_from_object(map: serde_json::Map<String, JsonValue>) -> Record {
    map.into_iter()
        .map(|(key, value)| (key, Value::from_json(value)))
        .collect()
}

fn shape_error(message: String) -> Error {
    Error::format(DataFormat::Json, FormatError::Shape(message))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// JSON writer emitting a top-level array of objects
pub struct JsonWriter<W: Write> {
    writer: W,
    options: JsonWriteOptions,
}

impl<W: Write> JsonWriter<W> {
    /// Create a new JSON writer with default options
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            options: JsonWriteOptions::default(),
        }
    }

    /// Create a JSON writer with custom options
    pub fn with_options(writer: W, options: JsonWriteOptions) -> Self {
        Self { writer, options }
    }

    /// Set pretty printing
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.options.pretty = pretty;
        self
    }

    /// Serialize every record, in order
    pub fn write_records(mut self, records: &RecordSet) -> Result<()> {
        if records.is_empty() {
            return Err(Error::EmptyRecordSet {
                format: DataFormat::Json,
            });
        }

        let rows = records.records();
        let written = if self.options.pretty {
            serde_json::to_writer_pretty(&mut self.writer, rows)
        } else {
            serde_json::to_writer(&mut self.writer, rows)
        };
        written.map_err(|e| Error::encode(DataFormat::Json, e))?;

        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Read JSON bytes into a record set
pub fn read_json(bytes: &[u8]) -> Result<RecordSet> {
    JsonReader::new(bytes).read_records()
}

/// Write a record set as JSON
pub fn write_json<W: Write>(writer: W, records: &RecordSet, options: &JsonWriteOptions) -> Result<()> {
    JsonWriter::with_options(writer, options.clone()).write_records(records)
}
