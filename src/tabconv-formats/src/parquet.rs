use crate::coerce::encode_row;
use crate::error::{Error, Result};
use crate::format::{check_magic, DataFormat};
use crate::infer::ColumnType;
use crate::schema::TableSchema;
use crate::scratch::Spooled;
use apache_avro::types::Value as AvroValue;
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanBuilder, Float64Builder, Int32Builder, Int64Builder,
    StringBuilder,
};
use arrow::datatypes::{
    DataType, Float16Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::ChunkReader;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::io::Write;
use std::sync::Arc;
use tabconv_shared::{Record, RecordSet, Value};

/// Key/value metadata entry holding the Avro schema JSON
pub const AVRO_SCHEMA_KEY: &str = "parquet.avro.schema";

/// Key/value metadata entry naming the object model
pub const WRITER_MODEL_KEY: &str = "writer.model.name";

/// Default maximum rows per row group
pub const DEFAULT_ROW_GROUP_SIZE: usize = 1024 * 1024;

/// Parquet-specific writing options
#[derive(Debug, Clone)]
pub struct ParquetWriteOptions {
    /// Compression algorithm
    pub compression: ParquetCompression,
    /// Row group size (number of rows per group)
    pub row_group_size: usize,
}

impl Default for ParquetWriteOptions {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::Snappy,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

/// Compression algorithms for Parquet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    /// No compression
    Uncompressed,
    /// Snappy compression (fast, good compression)
    #[default]
    Snappy,
    /// Gzip compression (slow, best compression)
    Gzip,
    /// Zstandard compression
    Zstd,
    /// LZ4 compression
    Lz4,
    /// Brotli compression
    Brotli,
}

impl From<ParquetCompression> for Compression {
    fn from(compression: ParquetCompression) -> Self {
        match compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4_RAW,
            ParquetCompression::Brotli => Compression::BROTLI(BrotliLevel::default()),
        }
    }
}

impl std::str::FromStr for ParquetCompression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(ParquetCompression::Uncompressed),
            "snappy" => Ok(ParquetCompression::Snappy),
            "gzip" => Ok(ParquetCompression::Gzip),
            "zstd" => Ok(ParquetCompression::Zstd),
            "lz4" => Ok(ParquetCompression::Lz4),
            "brotli" => Ok(ParquetCompression::Brotli),
            _ => Err(format!("unknown parquet compression: {s}")),
        }
    }
}

/// Decode a Parquet file, spooled or in memory, into records
pub fn read_parquet(input: Spooled) -> Result<RecordSet> {
    match input {
        Spooled::Memory(bytes) => {
            check_magic(DataFormat::Parquet, &bytes)?;
            read_batches(ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))?)
        }
        Spooled::File(file) => {
            let handle = file.reopen()?;
            read_batches(ParquetRecordBatchReaderBuilder::try_new(handle)?)
        }
    }
}

fn read_batches<T: ChunkReader + 'static>(
    builder: ParquetRecordBatchReaderBuilder<T>,
) -> Result<RecordSet> {
    let metadata = builder.metadata().clone();
    log::debug!(
        "parquet input: {} rows in {} row groups",
        metadata.file_metadata().num_rows(),
        metadata.num_row_groups()
    );

    let mut records = RecordSet::new();
    for batch in builder.build()? {
        let batch = batch?;
        append_batch(&mut records, &batch)?;
    }
    Ok(records)
}

fn append_batch(records: &mut RecordSet, batch: &RecordBatch) -> Result<()> {
    let schema = batch.schema();
    for row in 0..batch.num_rows() {
        let record = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, column)| Ok((field.name().clone(), cell(column.as_ref(), row)?)))
            .collect::<Result<Record>>()?;
        records.push(record);
    }
    Ok(())
}

/// Avro schema JSON stored in a Parquet file's key/value metadata
pub fn embedded_avro_schema(bytes: Vec<u8>) -> Result<Option<String>> {
    check_magic(DataFormat::Parquet, &bytes)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))?;
    let schema = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.key == AVRO_SCHEMA_KEY)
                .and_then(|entry| entry.value.clone())
        });
    Ok(schema)
}

/// Convert one cell of an Arrow array
fn cell(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Int8 => Value::Int(i32::from(array.as_primitive::<Int8Type>().value(row))),
        DataType::Int16 => Value::Int(i32::from(array.as_primitive::<Int16Type>().value(row))),
        DataType::Int32 => Value::Int(array.as_primitive::<Int32Type>().value(row)),
        DataType::UInt8 => Value::Int(i32::from(array.as_primitive::<UInt8Type>().value(row))),
        DataType::UInt16 => Value::Int(i32::from(array.as_primitive::<UInt16Type>().value(row))),
        DataType::UInt32 => Value::Long(i64::from(array.as_primitive::<UInt32Type>().value(row))),
        DataType::Int64 => Value::Long(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or_else(|_| Value::String(v.to_string()), Value::Long)
        }
        DataType::Float16 => Value::Double(array.as_primitive::<Float16Type>().value(row).to_f64()),
        DataType::Float32 => {
            Value::Double(f64::from(array.as_primitive::<Float32Type>().value(row)))
        }
        DataType::Float64 => Value::Double(array.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Utf8 => Value::string(array.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => Value::string(array.as_string::<i64>().value(row)),
        DataType::Utf8View => Value::string(array.as_string_view().value(row)),
        DataType::Binary => lossy(array.as_binary::<i32>().value(row)),
        DataType::LargeBinary => lossy(array.as_binary::<i64>().value(row)),
        DataType::BinaryView => lossy(array.as_binary_view().value(row)),
        DataType::FixedSizeBinary(_) => lossy(array.as_fixed_size_binary().value(row)),
        DataType::Struct(_)
        | DataType::List(_)
        | DataType::LargeList(_)
        | DataType::FixedSizeList(_, _)
        | DataType::Map(_, _) => Value::Opaque(cell_json(array, row)?),
        _ => Value::String(display(array, row)?),
    };
    Ok(value)
}

fn lossy(bytes: &[u8]) -> Value {
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

fn display(array: &dyn Array, row: usize) -> Result<String> {
    let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())?;
    Ok(formatter.value(row).to_string())
}

/// Nested cells as JSON, recursing through structs, lists and maps
fn cell_json(array: &dyn Array, row: usize) -> Result<JsonValue> {
    if array.is_null(row) {
        return Ok(JsonValue::Null);
    }

    match array.data_type() {
        DataType::Struct(_) => {
            let structs = array.as_struct();
            let mut map = JsonMap::new();
            for (field, column) in structs.fields().iter().zip(structs.columns()) {
                map.insert(field.name().clone(), cell_json(column.as_ref(), row)?);
            }
            Ok(JsonValue::Object(map))
        }
        DataType::List(_) => list_json(array.as_list::<i32>().value(row).as_ref()),
        DataType::LargeList(_) => list_json(array.as_list::<i64>().value(row).as_ref()),
        DataType::FixedSizeList(_, _) => {
            list_json(array.as_fixed_size_list().value(row).as_ref())
        }
        DataType::Map(_, _) => {
            let entries = array.as_map().value(row);
            let keys = entries.column(0);
            let values = entries.column(1);
            let mut map = JsonMap::new();
            for i in 0..entries.len() {
                let key = cell(keys.as_ref(), i)?.to_text();
                map.insert(key, cell_json(values.as_ref(), i)?);
            }
            Ok(JsonValue::Object(map))
        }
        _ => Ok(cell(array, row)?.to_json()),
    }
}

fn list_json(items: &dyn Array) -> Result<JsonValue> {
    (0..items.len())
        .map(|i| cell_json(items, i))
        .collect::<Result<Vec<_>>>()
        .map(JsonValue::Array)
}

/// Arrow builder for one typed column
enum ColumnBuilder {
    Integer(Int32Builder),
    Long(Int64Builder),
    Double(Float64Builder),
    Boolean(BooleanBuilder),
    String(StringBuilder),
}

impl ColumnBuilder {
    fn new(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::Integer => ColumnBuilder::Integer(Int32Builder::with_capacity(capacity)),
            ColumnType::Long => ColumnBuilder::Long(Int64Builder::with_capacity(capacity)),
            ColumnType::Double => ColumnBuilder::Double(Float64Builder::with_capacity(capacity)),
            ColumnType::Boolean => ColumnBuilder::Boolean(BooleanBuilder::with_capacity(capacity)),
            ColumnType::String => ColumnBuilder::String(StringBuilder::new()),
        }
    }

    fn append(&mut self, value: &AvroValue) {
        let value = match value {
            AvroValue::Union(_, inner) => inner.as_ref(),
            other => other,
        };

        match (self, value) {
            (ColumnBuilder::Integer(b), AvroValue::Int(i)) => b.append_value(*i),
            (ColumnBuilder::Long(b), AvroValue::Long(l)) => b.append_value(*l),
            (ColumnBuilder::Double(b), AvroValue::Double(d)) => b.append_value(*d),
            (ColumnBuilder::Boolean(b), AvroValue::Boolean(v)) => b.append_value(*v),
            (ColumnBuilder::String(b), AvroValue::String(s)) => b.append_value(s),
            (builder, _) => builder.append_null(),
        }
    }

    fn append_null(&mut self) {
        match self {
            ColumnBuilder::Integer(b) => b.append_null(),
            ColumnBuilder::Long(b) => b.append_null(),
            ColumnBuilder::Double(b) => b.append_null(),
            ColumnBuilder::Boolean(b) => b.append_null(),
            ColumnBuilder::String(b) => b.append_null(),
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Integer(b) => Arc::new(b.finish()),
            ColumnBuilder::Long(b) => Arc::new(b.finish()),
            ColumnBuilder::Double(b) => Arc::new(b.finish()),
            ColumnBuilder::Boolean(b) => Arc::new(b.finish()),
            ColumnBuilder::String(b) => Arc::new(b.finish()),
        }
    }
}

/// Write coerced records as Parquet with the Avro schema embedded
pub fn write_parquet<W: Write + Send>(
    writer: W,
    records: &RecordSet,
    schema: &TableSchema,
    options: &ParquetWriteOptions,
) -> Result<()> {
    if records.is_empty() {
        return Err(Error::EmptyRecordSet {
            format: DataFormat::Parquet,
        });
    }

    let avro = schema.to_avro()?;
    let field_schemas = crate::schema::field_schemas(&avro);
    let arrow_schema = Arc::new(schema.to_arrow());
    let row_group_size = options.row_group_size.max(1);

    let props = WriterProperties::builder()
        .set_compression(options.compression.into())
        .set_max_row_group_size(row_group_size)
        .set_key_value_metadata(Some(vec![
            KeyValue::new(AVRO_SCHEMA_KEY.to_string(), schema.to_avro_json().to_string()),
            KeyValue::new(WRITER_MODEL_KEY.to_string(), "avro".to_string()),
        ]))
        .build();

    let mut arrow_writer = ArrowWriter::try_new(writer, arrow_schema.clone(), Some(props))
        .map_err(|e| Error::encode(DataFormat::Parquet, e))?;

    for chunk in records.records().chunks(row_group_size) {
        let mut builders: Vec<ColumnBuilder> = schema
            .fields()
            .iter()
            .map(|field| ColumnBuilder::new(field.field_type, chunk.len()))
            .collect();

        for record in chunk {
            let row = encode_row(record, schema.fields(), &field_schemas);
            for (builder, (_, value)) in builders.iter_mut().zip(&row) {
                builder.append(value);
            }
        }

        let columns: Vec<ArrayRef> = builders.iter_mut().map(ColumnBuilder::finish).collect();
        let batch = RecordBatch::try_new(arrow_schema.clone(), columns)
            .map_err(|e| Error::encode(DataFormat::Parquet, e))?;
        arrow_writer
            .write(&batch)
            .map_err(|e| Error::encode(DataFormat::Parquet, e))?;
    }

    arrow_writer
        .close()
        .map_err(|e| Error::encode(DataFormat::Parquet, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::infer_schema;
    use arrow::array::{Int32Array, ListBuilder, StringArray, StructArray};
    use arrow::datatypes::{Field, Schema};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabconv_shared::record;

    fn write_to_vec(records: &RecordSet, options: &ParquetWriteOptions) -> Vec<u8> {
        let schema = infer_schema(records).unwrap();
        let mut buffer = Vec::new();
        write_parquet(&mut buffer, records, &schema, options).unwrap();
        buffer
    }

    #[test]
    fn test_write_then_read_typed_values() {
        let records = RecordSet::from_records(vec![
            record! { "id" => 1, "score" => 3.5, "active" => true, "name" => "a" },
            record! { "id" => 2, "score" => Value::Null, "active" => false, "name" => Value::Null },
        ]);
        let bytes = write_to_vec(&records, &ParquetWriteOptions::default());
        assert_eq!(&bytes[..4], b"PAR1");

        let back = read_parquet(Spooled::Memory(bytes)).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_embedded_avro_schema() {
        let records = RecordSet::from_records(vec![record! { "id" => 1 }]);
        let bytes = write_to_vec(&records, &ParquetWriteOptions::default());

        let embedded = embedded_avro_schema(bytes).unwrap().unwrap();
        let parsed: JsonValue = serde_json::from_str(&embedded).unwrap();
        assert_eq!(
            parsed,
            json!({
                "type": "record",
                "name": "Record",
                "fields": [{"name": "id", "type": ["null", "int"]}]
            })
        );
    }

    #[test]
    fn test_unencodable_cells_are_nulled() {
        let records = RecordSet::from_records(vec![
            record! { "n" => 1 },
            record! { "n" => "oops" },
        ]);
        let bytes = write_to_vec(&records, &ParquetWriteOptions::default());
        let back = read_parquet(Spooled::Memory(bytes)).unwrap();
        assert_eq!(back.records()[1]["n"], Value::Null);
    }

    #[test]
    fn test_small_row_groups_and_compression() {
        let records: RecordSet = (0..10).map(|i| record! { "i" => i }).collect();
        let options = ParquetWriteOptions {
            compression: ParquetCompression::Zstd,
            row_group_size: 3,
        };
        let bytes = write_to_vec(&records, &options);
        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes.clone())).unwrap();
        assert_eq!(builder.metadata().num_row_groups(), 4);

        let back = read_parquet(Spooled::Memory(bytes)).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_read_from_scratch_file() {
        let records = RecordSet::from_records(vec![record! { "s" => "x" }]);
        let bytes = write_to_vec(&records, &ParquetWriteOptions::default());
        let dir = tempfile::tempdir().unwrap();
        let spooled = crate::scratch::Scratch::in_dir(dir.path()).spool(bytes).unwrap();
        assert_eq!(read_parquet(spooled).unwrap(), records);
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = read_parquet(Spooled::Memory(b"not parquet".to_vec())).unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                format: DataFormat::Parquet,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_columns_become_opaque() {
        let mut list_builder = ListBuilder::new(Int32Builder::new());
        list_builder.values().append_value(1);
        list_builder.values().append_value(2);
        list_builder.append(true);
        let list = list_builder.finish();

        let structs = StructArray::from(vec![(
            Arc::new(Field::new("k", DataType::Utf8, true)),
            Arc::new(StringArray::from(vec!["v"])) as ArrayRef,
        )]);

        let schema = Arc::new(Schema::new(vec![
            Field::new("list", list.data_type().clone(), true),
            Field::new("obj", structs.data_type().clone(), true),
            Field::new("n", DataType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(list) as ArrayRef,
                Arc::new(structs) as ArrayRef,
                Arc::new(Int32Array::from(vec![Some(7)])) as ArrayRef,
            ],
        )
        .unwrap();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let back = read_parquet(Spooled::Memory(buffer)).unwrap();
        assert_eq!(
            back.records()[0],
            record! {
                "list" => Value::Opaque(json!([1, 2])),
                "obj" => Value::Opaque(json!({"k": "v"})),
                "n" => 7,
            }
        );
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!(
            "ZSTD".parse::<ParquetCompression>().unwrap(),
            ParquetCompression::Zstd
        );
        assert_eq!(
            "none".parse::<ParquetCompression>().unwrap(),
            ParquetCompression::Uncompressed
        );
        assert!("lzo".parse::<ParquetCompression>().is_err());
    }
}
