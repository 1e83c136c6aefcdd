//! Column type inference
//!
//! Every column of a [`RecordSet`] is classified into exactly one
//! [`ColumnType`]. Classification looks at the non-null, non-empty cells only
//! and is total: a column that cannot be proven numeric or boolean is a string
//! column. Numeric classification always wins over boolean, so a `0`/`1` coded
//! flag column stays an integer column.

use std::fmt;
use tabconv_shared::{RecordSet, Value};

/// Physical type assigned to a column; every column is nullable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// Double precision float
    Double,
    /// Boolean
    Boolean,
    /// UTF-8 text
    String,
}

impl ColumnType {
    /// Name of the matching Avro primitive
    pub fn avro_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "Integer",
            ColumnType::Long => "Long",
            ColumnType::Double => "Double",
            ColumnType::Boolean => "Boolean",
            ColumnType::String => "String",
        };
        f.write_str(name)
    }
}

/// Numeric reading of a single cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Integral(i64),
    Decimal(f64),
}

/// Parse cell text the way inference and coercion both expect
///
/// Text with `.`, `e` or `E` is read as a double, anything else as a 64-bit
/// integer.
pub(crate) fn parse_numeric(text: &str) -> Option<Numeric> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().ok().map(Numeric::Decimal)
    } else {
        text.parse::<i64>().ok().map(Numeric::Integral)
    }
}

/// Case-insensitive `true`, `false`, `1` or `0`
pub(crate) fn is_boolean_token(text: &str) -> bool {
    text == "1"
        || text == "0"
        || text.eq_ignore_ascii_case("true")
        || text.eq_ignore_ascii_case("false")
}

#[derive(Debug)]
struct Tally {
    seen: bool,
    all_numeric: bool,
    decimal: bool,
    fits_int: bool,
    all_boolean: bool,
}

impl Default for Tally {
    fn default() -> Self {
        Self {
            seen: false,
            all_numeric: true,
            decimal: false,
            fits_int: true,
            all_boolean: true,
        }
    }
}

impl Tally {
    fn integral(&mut self, n: i64) {
        if i32::try_from(n).is_err() {
            self.fits_int = false;
        }
    }

    fn observe(&mut self, value: &Value) {
        if value.is_missing() {
            return;
        }
        self.seen = true;

        match value {
            Value::Null => {}
            Value::Int(i) => {
                self.integral(i64::from(*i));
                self.all_boolean &= *i == 0 || *i == 1;
            }
            Value::Long(l) => {
                self.integral(*l);
                self.all_boolean &= *l == 0 || *l == 1;
            }
            Value::Double(_) => {
                self.decimal = true;
                self.all_boolean = false;
            }
            Value::Bool(_) => {
                self.all_numeric = false;
            }
            Value::String(s) => {
                match parse_numeric(s) {
                    Some(Numeric::Integral(n)) => self.integral(n),
                    Some(Numeric::Decimal(_)) => self.decimal = true,
                    None => self.all_numeric = false,
                }
                self.all_boolean &= is_boolean_token(s);
            }
            Value::Opaque(_) => {
                self.all_numeric = false;
                self.all_boolean = false;
            }
        }
    }

    fn resolve(&self) -> ColumnType {
        if !self.seen {
            ColumnType::String
        } else if self.all_numeric && !self.decimal {
            if self.fits_int {
                ColumnType::Integer
            } else {
                ColumnType::Long
            }
        } else if self.all_numeric {
            ColumnType::Double
        } else if self.all_boolean {
            ColumnType::Boolean
        } else {
            ColumnType::String
        }
    }
}

/// Classify a sequence of cells
pub fn infer_values<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut tally = Tally::default();
    for value in values {
        tally.observe(value);
    }
    tally.resolve()
}

/// Classify one column of a record set
pub fn infer_column_type(records: &RecordSet, column: &str) -> ColumnType {
    infer_values(records.column_values(column))
}

/// Classify every column, in first-seen order
pub fn infer_column_types(records: &RecordSet) -> Vec<(String, ColumnType)> {
    records
        .columns()
        .into_iter()
        .map(|column| {
            let column_type = infer_column_type(records, &column);
            log::trace!("column {column} inferred as {column_type}");
            (column, column_type)
        })
        .collect()
}
