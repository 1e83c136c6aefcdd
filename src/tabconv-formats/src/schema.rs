//! Schema inference for the binary write path
//!
//! Runs after coercion. Each column's field type is picked from the value
//! kinds actually present, highest priority first:
//! Double > Long > Integer > Boolean > String. Any nested value forces the
//! field to String. Every field is a `["null", T]` union.

use crate::error::{Error, Result};
use crate::infer::ColumnType;
use apache_avro::Schema as AvroSchema;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use indexmap::IndexSet;
use serde_json::json;
use tabconv_shared::{RecordSet, Value};

/// Name of the single record type in every generated schema
pub const RECORD_NAME: &str = "Record";

/// One field of a [`TableSchema`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Field name, valid under Avro naming rules
    pub name: String,
    /// Column name in the record set
    pub column: String,
    /// Field type; always nullable
    pub field_type: ColumnType,
}

/// Ordered, nullable-field schema shared by the Parquet and Avro writers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    fields: Vec<SchemaField>,
}

impl TableSchema {
    /// Build a schema from `(column, type)` pairs, sanitizing names
    pub fn from_columns<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (String, ColumnType)>,
    {
        let mut used: IndexSet<String> = IndexSet::new();
        let fields = columns
            .into_iter()
            .map(|(column, field_type)| {
                let name = unique_name(&sanitize_name(&column), &used);
                if name != column {
                    log::warn!("column {column:?} renamed to {name:?} for the binary schema");
                }
                used.insert(name.clone());
                SchemaField {
                    name,
                    column,
                    field_type,
                }
            })
            .collect();
        Self { fields }
    }

    /// Fields in column order
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Avro record schema as JSON
    pub fn to_avro_json(&self) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = self
            .fields
            .iter()
            .map(|field| {
                json!({
                    "name": field.name,
                    "type": ["null", field.field_type.avro_name()],
                })
            })
            .collect();

        json!({
            "type": "record",
            "name": RECORD_NAME,
            "fields": fields,
        })
    }

    /// Parsed Avro record schema
    pub fn to_avro(&self) -> Result<AvroSchema> {
        AvroSchema::parse(&self.to_avro_json())
            .map_err(|e| Error::SchemaInference(format!("generated Avro schema is invalid: {e}")))
    }

    /// Arrow schema with one nullable field per column
    pub fn to_arrow(&self) -> ArrowSchema {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|field| Field::new(&field.name, arrow_type(field.field_type), true))
            .collect();
        ArrowSchema::new(fields)
    }
}

/// Arrow type that stores a column type
pub fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Integer => DataType::Int32,
        ColumnType::Long => DataType::Int64,
        ColumnType::Double => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::String => DataType::Utf8,
    }
}

/// Per-field schemas of a record schema, in field order
pub fn field_schemas(avro: &AvroSchema) -> Vec<AvroSchema> {
    match avro {
        AvroSchema::Record(record) => record.fields.iter().map(|f| f.schema.clone()).collect(),
        _ => Vec::new(),
    }
}

/// Infer the binary schema of an already coerced record set
pub fn infer_schema(records: &RecordSet) -> Result<TableSchema> {
    if records.is_empty() {
        return Err(Error::SchemaInference(
            "cannot infer schema from empty data".to_string(),
        ));
    }

    let columns = records.columns().into_iter().map(|column| {
        let field_type = field_type(records.column_values(&column));
        (column, field_type)
    });
    let schema = TableSchema::from_columns(columns);

    log::debug!("inferred schema with {} fields", schema.len());
    Ok(schema)
}

fn field_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut best: Option<ColumnType> = None;
    for value in values {
        let kind = match value {
            Value::Null => continue,
            Value::Opaque(_) => return ColumnType::String,
            Value::Double(_) => ColumnType::Double,
            Value::Long(_) => ColumnType::Long,
            Value::Int(_) => ColumnType::Integer,
            Value::Bool(_) => ColumnType::Boolean,
            Value::String(_) => ColumnType::String,
        };
        if best.is_none_or(|current| priority(kind) > priority(current)) {
            best = Some(kind);
        }
    }
    best.unwrap_or(ColumnType::String)
}

fn priority(column_type: ColumnType) -> u8 {
    match column_type {
        ColumnType::Double => 4,
        ColumnType::Long => 3,
        ColumnType::Integer => 2,
        ColumnType::Boolean => 1,
        ColumnType::String => 0,
    }
}

/// Map a column name onto Avro name rules: `[A-Za-z_][A-Za-z0-9_]*`
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

fn unique_name(candidate: &str, used: &IndexSet<String>) -> String {
    if !used.contains(candidate) {
        return candidate.to_string();
    }
    (2..)
        .map(|n| format!("{candidate}_{n}"))
        .find(|name| !used.contains(name))
        .unwrap_or_else(|| candidate.to_string())
}
