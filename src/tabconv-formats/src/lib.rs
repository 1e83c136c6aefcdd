//! tabconv-formats: schema-inferring conversion engine for tabconv
//!
//! This crate reads loosely-typed text formats and strongly-typed binary
//! formats into a single record model, and writes that model back out. When
//! the target is binary, column types are inferred from the data, cells are
//! coerced to those types and a nullable Avro schema is derived.
//!
//! # Supported Formats
//!
//! - **CSV** (`.csv`) - header row first; every cell is read as a string
//! - **JSON** (`.json`) - an array of objects, or a single object
//! - **XML** (`.xml`) - a `records` root holding `record` elements
//! - **Parquet** (`.parquet`, `.pq`) - with the Avro schema in the file metadata
//! - **Avro** (`.avro`) - object container files, `null` or `snappy` codec
//!
//! # Architecture
//!
//! - [`DataFormat`] - the declared format of an input or output
//! - [`DataReader`] / [`DataWriter`] - traits for reading/writing record sets
//! - [`infer`], [`coerce`] and [`schema`] - the binary write preparation
//! - [`convert()`] - read then write, with writer failures naming both formats
//!
//! # Example
//!
//! ```
//! use tabconv_formats::{convert, ConvertOptions, DataFormat};
//!
//! let csv = b"id,score\n1,3.5\n2,4\n".to_vec();
//! let json = convert(csv, DataFormat::Csv, DataFormat::Json, &ConvertOptions::default()).unwrap();
//! assert!(String::from_utf8(json).unwrap().contains("\"score\": \"3.5\""));
//! ```

pub use tabconv_shared::{BuildInfo, Record, RecordSet, Value, VERSION};

// Core modules
/// Error types and result handling
pub mod error;
/// Format descriptor and extension mapping
pub mod format;
/// Scratch storage for binary inputs
pub mod scratch;

// Type system
/// Column type coercion and binary cell encoding
pub mod coerce;
/// Column type inference
pub mod infer;
/// Nullable Avro/Arrow schema inference
pub mod schema;

// Format implementations
/// Avro container reading and writing
pub mod avro;
/// CSV format reading and writing
pub mod csv;
/// JSON format reading and writing
pub mod json;
/// Parquet format reading and writing
pub mod parquet;
/// XML format reading and writing
pub mod xml;

// Generic reader/writer interfaces
/// Conversion between declared formats
pub mod convert;
/// Generic data reader interface
pub mod reader;
/// Generic data writer interface
pub mod writer;

// Re-export main types for convenience
pub use crate::avro::{AvroCompression, AvroWriteOptions};
pub use crate::csv::{CsvReadOptions, CsvWriteOptions, QuoteStyle};
pub use crate::json::JsonWriteOptions;
pub use crate::parquet::{embedded_avro_schema, ParquetCompression, ParquetWriteOptions};
pub use crate::xml::XmlWriteOptions;
pub use coerce::{apply_column_types, coerce};
pub use convert::{convert, read_records, write_records, ConvertOptions};
pub use error::{Error, FormatError, Result};
pub use format::DataFormat;
pub use infer::{infer_column_type, infer_column_types, ColumnType};
pub use reader::{deserialize, DataReader, FileReader, MemoryReader, ReadOptions};
pub use schema::{infer_schema, SchemaField, TableSchema};
pub use scratch::Scratch;
pub use writer::{prepare_binary, serialize, DataWriter, MemoryWriter, WriteOptions};
