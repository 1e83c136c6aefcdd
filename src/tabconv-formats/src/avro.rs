use crate::coerce::encode_row;
use crate::error::{Error, FormatError, Result};
use crate::format::{check_magic, DataFormat};
use crate::schema::{field_schemas, TableSchema};
use apache_avro::types::Value as AvroValue;
use apache_avro::{Codec, Reader, Writer};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::io::Write;
use tabconv_shared::{Record, RecordSet, Value};

/// Avro-specific writing options
#[derive(Debug, Clone, Default)]
pub struct AvroWriteOptions {
    /// Block compression codec
    pub compression: AvroCompression,
}

/// Avro compression options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvroCompression {
    /// No compression
    Null,
    /// Snappy compression
    #[default]
    Snappy,
}

impl From<AvroCompression> for Codec {
    fn from(compression: AvroCompression) -> Self {
        match compression {
            AvroCompression::Null => Codec::Null,
            AvroCompression::Snappy => Codec::Snappy,
        }
    }
}

impl std::str::FromStr for AvroCompression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" | "none" => Ok(AvroCompression::Null),
            "snappy" => Ok(AvroCompression::Snappy),
            _ => Err(format!("unknown avro compression: {s}")),
        }
    }
}

/// Decode an Avro object container file
pub fn read_avro(bytes: &[u8]) -> Result<RecordSet> {
    check_magic(DataFormat::Avro, bytes)?;
    let reader = Reader::new(bytes)?;

    let mut records = RecordSet::new();
    for value in reader {
        match value? {
            AvroValue::Record(fields) => records.push(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, avro_cell(value)))
                    .collect::<Record>(),
            ),
            other => {
                return Err(Error::format(
                    DataFormat::Avro,
                    FormatError::Unsupported(format!(
                        "top-level datum must be a record, found {other:?}"
                    )),
                ))
            }
        }
    }
    Ok(records)
}

fn avro_cell(value: AvroValue) -> Value {
    match value {
        AvroValue::Null => Value::Null,
        AvroValue::Boolean(b) => Value::Bool(b),
        AvroValue::Int(i) => Value::Int(i),
        AvroValue::Long(l) => Value::Long(l),
        AvroValue::Float(f) => Value::Double(f64::from(f)),
        AvroValue::Double(d) => Value::Double(d),
        AvroValue::String(s) | AvroValue::Enum(_, s) => Value::String(s),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => {
            Value::String(String::from_utf8_lossy(&b).into_owned())
        }
        AvroValue::Union(_, inner) => avro_cell(*inner),
        nested @ (AvroValue::Array(_) | AvroValue::Map(_) | AvroValue::Record(_)) => {
            Value::Opaque(nested_json(nested))
        }
        other => {
            let rendered = format!("{other:?}");
            JsonValue::try_from(other).map_or(Value::String(rendered), Value::from_json)
        }
    }
}

/// Nested values keep their structure; leaves decode like top-level cells
fn nested_json(value: AvroValue) -> JsonValue {
    match value {
        AvroValue::Array(items) => JsonValue::Array(items.into_iter().map(nested_json).collect()),
        AvroValue::Map(entries) => {
            let mut entries: Vec<(String, AvroValue)> = entries.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            JsonValue::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, nested_json(value)))
                    .collect::<JsonMap<String, JsonValue>>(),
            )
        }
        AvroValue::Record(fields) => JsonValue::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name, nested_json(value)))
                .collect::<JsonMap<String, JsonValue>>(),
        ),
        AvroValue::Union(_, inner) => nested_json(*inner),
        leaf => avro_cell(leaf).to_json(),
    }
}

/// Write coerced records as an Avro object container file
pub fn write_avro<W: Write>(
    writer: W,
    records: &RecordSet,
    schema: &TableSchema,
    options: &AvroWriteOptions,
) -> Result<()> {
    if records.is_empty() {
        return Err(Error::EmptyRecordSet {
            format: DataFormat::Avro,
        });
    }

    let avro = schema.to_avro()?;
    let field_schemas = field_schemas(&avro);
    let mut avro_writer = Writer::with_codec(&avro, writer, options.compression.into());

    for record in records {
        let row = encode_row(record, schema.fields(), &field_schemas);
        avro_writer
            .append(AvroValue::Record(row))
            .map_err(|e| Error::encode(DataFormat::Avro, e))?;
    }

    let mut inner = avro_writer
        .into_inner()
        .map_err(|e| Error::encode(DataFormat::Avro, e))?;
    inner.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::infer_schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabconv_shared::record;

    fn write_to_vec(records: &RecordSet, options: &AvroWriteOptions) -> Vec<u8> {
        let schema = infer_schema(records).unwrap();
        let mut buffer = Vec::new();
        write_avro(&mut buffer, records, &schema, options).unwrap();
        buffer
    }

    #[test]
    fn test_write_then_read() {
        let records = RecordSet::from_records(vec![
            record! { "id" => 1, "big" => 5_000_000_000_i64, "ok" => true, "name" => "x" },
            record! { "id" => Value::Null, "big" => 2_i64, "ok" => false, "name" => Value::Null },
        ]);
        for compression in [AvroCompression::Null, AvroCompression::Snappy] {
            let bytes = write_to_vec(&records, &AvroWriteOptions { compression });
            assert_eq!(&bytes[..4], b"Obj\x01");
            assert_eq!(read_avro(&bytes).unwrap(), records);
        }
    }

    #[test]
    fn test_writer_schema_is_nullable_record() {
        let records = RecordSet::from_records(vec![record! { "score" => 1.5 }]);
        let bytes = write_to_vec(&records, &AvroWriteOptions::default());
        let reader = Reader::new(&bytes[..]).unwrap();
        let schema_json: JsonValue =
            serde_json::to_value(reader.writer_schema()).unwrap();
        assert_eq!(schema_json["name"], json!("Record"));
        assert_eq!(schema_json["fields"][0]["type"], json!(["null", "double"]));
    }

    #[test]
    fn test_nested_values_become_opaque() {
        let schema = apache_avro::Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[
                {"name":"tags","type":{"type":"array","items":"string"}},
                {"name":"raw","type":"bytes"}
            ]}"#,
        )
        .unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        writer
            .append(AvroValue::Record(vec![
                (
                    "tags".to_string(),
                    AvroValue::Array(vec![AvroValue::String("a".into())]),
                ),
                ("raw".to_string(), AvroValue::Bytes(b"hi".to_vec())),
            ]))
            .unwrap();
        let bytes = writer.into_inner().unwrap();

        let records = read_avro(&bytes).unwrap();
        assert_eq!(
            records.records()[0],
            record! { "tags" => Value::Opaque(json!(["a"])), "raw" => "hi" }
        );
    }

    #[test]
    fn test_nested_binary_decodes_to_text() {
        let schema = apache_avro::Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[
                {"name":"chunks","type":{"type":"array","items":"bytes"}},
                {"name":"attrs","type":{"type":"map","values":["null","bytes"]}}
            ]}"#,
        )
        .unwrap();
        let attrs: std::collections::HashMap<String, AvroValue> = [
            (
                "zeta".to_string(),
                AvroValue::Union(1, Box::new(AvroValue::Bytes(b"z".to_vec()))),
            ),
            ("alpha".to_string(), AvroValue::Union(0, Box::new(AvroValue::Null))),
            (
                "mid".to_string(),
                AvroValue::Union(1, Box::new(AvroValue::Bytes(b"m".to_vec()))),
            ),
        ]
        .into_iter()
        .collect();
        let mut writer = Writer::new(&schema, Vec::new());
        writer
            .append(AvroValue::Record(vec![
                (
                    "chunks".to_string(),
                    AvroValue::Array(vec![AvroValue::Bytes(b"hi".to_vec())]),
                ),
                ("attrs".to_string(), AvroValue::Map(attrs)),
            ]))
            .unwrap();
        let bytes = writer.into_inner().unwrap();

        let records = read_avro(&bytes).unwrap();
        let record = &records.records()[0];
        assert_eq!(record["chunks"], Value::Opaque(json!(["hi"])));
        match &record["attrs"] {
            Value::Opaque(JsonValue::Object(map)) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
                assert_eq!(map["alpha"], JsonValue::Null);
                assert_eq!(map["zeta"], json!("z"));
            }
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn test_non_record_datum_is_unsupported() {
        let schema = apache_avro::Schema::parse_str(r#""int""#).unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        writer.append(AvroValue::Int(7)).unwrap();
        let bytes = writer.into_inner().unwrap();

        let err = read_avro(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                format: DataFormat::Avro,
                source: FormatError::Unsupported(_),
            }
        ));
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = read_avro(b"definitely not avro").unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                format: DataFormat::Avro,
                ..
            }
        ));
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!(
            "SNAPPY".parse::<AvroCompression>().unwrap(),
            AvroCompression::Snappy
        );
        assert!("bzip2".parse::<AvroCompression>().is_err());
    }
}
