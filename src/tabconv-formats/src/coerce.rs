//! Value coercion
//!
//! Two directions: [`coerce`] turns loosely typed cells into the type chosen by
//! inference, and [`to_avro_value`] turns a coerced cell into the primitive the
//! binary schema expects. Neither step fails on a single bad cell.

use crate::infer::ColumnType;
use crate::schema::SchemaField;
use apache_avro::schema::UnionSchema;
use apache_avro::types::Value as AvroValue;
use apache_avro::Schema as AvroSchema;
use tabconv_shared::{Record, RecordSet, Value};

static NULL: Value = Value::Null;

/// Coerce one cell to a column type
///
/// Null or empty text becomes [`Value::Null`]. A cell that does not parse as
/// the target type keeps its original text.
pub fn coerce(value: &Value, target: ColumnType) -> Value {
    if value.is_missing() {
        return Value::Null;
    }

    match target {
        ColumnType::Integer => match value {
            Value::Int(i) => Value::Int(*i),
            Value::Long(l) => i32::try_from(*l).map_or_else(|_| keep(value), Value::Int),
            other => other
                .to_text()
                .parse::<i32>()
                .map_or_else(|_| keep(value), Value::Int),
        },
        ColumnType::Long => match value {
            Value::Int(i) => Value::Long(i64::from(*i)),
            Value::Long(l) => Value::Long(*l),
            other => other
                .to_text()
                .parse::<i64>()
                .map_or_else(|_| keep(value), Value::Long),
        },
        ColumnType::Double => match value {
            Value::Int(i) => Value::Double(f64::from(*i)),
            Value::Long(l) => Value::Double(*l as f64),
            Value::Double(d) => Value::Double(*d),
            other => other
                .to_text()
                .parse::<f64>()
                .map_or_else(|_| keep(value), Value::Double),
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Value::Bool(*b),
            other => {
                let text = other.to_text();
                Value::Bool(text == "1" || text.eq_ignore_ascii_case("true"))
            }
        },
        ColumnType::String => match value {
            Value::Opaque(json) => Value::Opaque(json.clone()),
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_text()),
        },
    }
}

fn keep(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_text()),
    }
}

/// Rewrite every record so it carries every typed column, in column order
///
/// Absent keys become [`Value::Null`]; keys not listed in `types` are dropped.
pub fn apply_column_types(records: &mut RecordSet, types: &[(String, ColumnType)]) {
    for record in records.records_mut() {
        let mut typed = Record::with_capacity(types.len());
        for (column, column_type) in types {
            let coerced = match record.get(column.as_str()) {
                Some(value) => coerce(value, *column_type),
                None => Value::Null,
            };
            typed.insert(column.clone(), coerced);
        }
        *record = typed;
    }
}

/// Map a coerced cell onto the primitive a binary schema expects
///
/// Unions resolve to their null branch for null cells and to their first
/// non-null branch otherwise. Numbers widen or narrow with plain casts, so a
/// double written to an `int` slot truncates toward zero. Anything else is
/// rendered as text.
pub fn to_avro_value(value: &Value, schema: &AvroSchema) -> AvroValue {
    match (value, schema) {
        (_, AvroSchema::Union(union)) => union_value(value, union),
        (Value::Null, _) => AvroValue::Null,

        (Value::Int(i), AvroSchema::Int) => AvroValue::Int(*i),
        (Value::Int(i), AvroSchema::Long) => AvroValue::Long(i64::from(*i)),
        (Value::Int(i), AvroSchema::Float) => AvroValue::Float(*i as f32),
        (Value::Int(i), AvroSchema::Double) => AvroValue::Double(f64::from(*i)),

        (Value::Long(l), AvroSchema::Int) => AvroValue::Int(*l as i32),
        (Value::Long(l), AvroSchema::Long) => AvroValue::Long(*l),
        (Value::Long(l), AvroSchema::Float) => AvroValue::Float(*l as f32),
        (Value::Long(l), AvroSchema::Double) => AvroValue::Double(*l as f64),

        (Value::Double(d), AvroSchema::Int) => AvroValue::Int(*d as i32),
        (Value::Double(d), AvroSchema::Long) => AvroValue::Long(*d as i64),
        (Value::Double(d), AvroSchema::Float) => AvroValue::Float(*d as f32),
        (Value::Double(d), AvroSchema::Double) => AvroValue::Double(*d),

        (Value::Bool(b), AvroSchema::Boolean) => AvroValue::Boolean(*b),

        (other, _) => AvroValue::String(other.to_text()),
    }
}

fn union_value(value: &Value, union: &UnionSchema) -> AvroValue {
    let variants = union.variants();
    let null_branch = variants
        .iter()
        .position(|branch| matches!(branch, AvroSchema::Null));

    if value.is_null() {
        if let Some(index) = null_branch {
            return AvroValue::Union(index as u32, Box::new(AvroValue::Null));
        }
    }

    match variants
        .iter()
        .enumerate()
        .find(|(_, branch)| !matches!(branch, AvroSchema::Null))
    {
        Some((index, branch)) => {
            AvroValue::Union(index as u32, Box::new(to_avro_value(value, branch)))
        }
        None => AvroValue::Union(null_branch.unwrap_or(0) as u32, Box::new(AvroValue::Null)),
    }
}

/// Binary coercion for one named field, nulling cells the schema cannot hold
///
/// A cell that kept its original text during [`coerce`] cannot be stored in a
/// numeric or boolean slot. It is written as null and reported.
pub fn to_avro_field(value: &Value, schema: &AvroSchema, field: &str) -> AvroValue {
    let encoded = to_avro_value(value, schema);
    if encoded.validate(schema) {
        encoded
    } else {
        log::warn!(
            "field {field}: cannot store {:?} as {}, writing null",
            value.to_text(),
            schema_kind(schema)
        );
        to_avro_value(&Value::Null, schema)
    }
}

/// Binary-coerce one record against schema fields, in field order
pub fn encode_row(
    record: &Record,
    fields: &[SchemaField],
    field_schemas: &[AvroSchema],
) -> Vec<(String, AvroValue)> {
    fields
        .iter()
        .zip(field_schemas)
        .map(|(field, schema)| {
            let value = record.get(field.column.as_str()).unwrap_or(&NULL);
            (field.name.clone(), to_avro_field(value, schema, &field.name))
        })
        .collect()
}

fn schema_kind(schema: &AvroSchema) -> String {
    match schema {
        AvroSchema::Union(union) => union
            .variants()
            .iter()
            .find(|branch| !matches!(branch, AvroSchema::Null))
            .map_or_else(|| "null".to_string(), schema_kind),
        other => serde_json::to_string(other).unwrap_or_else(|_| "unknown".to_string()),
    }
}
