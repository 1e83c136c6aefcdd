use crate::value::Value;
use indexmap::{IndexMap, IndexSet};

/// Ordered mapping from column name to value
pub type Record = IndexMap<String, Value>;

static NULL: Value = Value::Null;

/// Ordered sequence of records
///
/// Column identity is the union of keys across all records, in first-seen
/// order. A record that lacks a column reads as [`Value::Null`] for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty record set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-built records
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Append a record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow the records
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Mutably borrow the records
    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Iterate over the records
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Union of all keys, in first-seen order
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for record in &self.records {
            for key in record.keys() {
                seen.insert(key.as_str());
            }
        }
        seen.into_iter().map(str::to_string).collect()
    }

    /// Values of one column across all records, `Null` where the key is absent
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.records
            .iter()
            .map(move |record| record.get(column).unwrap_or(&NULL))
    }

    /// Keys of the first record, the header for positional writers
    #[must_use]
    pub fn first_record_keys(&self) -> Vec<String> {
        self.records
            .first()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Build a [`Record`] from `key => value` pairs, keeping their order
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_columns_first_seen_order() {
        let set = RecordSet::from_records(vec![
            record! { "b" => "1", "a" => "2" },
            record! { "c" => "3", "a" => "4" },
            record! { "d" => Value::Null },
        ]);
        assert_eq!(set.columns(), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_column_values_fill_absent_with_null() {
        let set = RecordSet::from_records(vec![
            record! { "a" => "x" },
            record! { "b" => "y" },
        ]);
        let values: Vec<&Value> = set.column_values("a").collect();
        assert_eq!(values, vec![&Value::string("x"), &Value::Null]);
    }

    #[test]
    fn test_first_record_keys() {
        let set = RecordSet::from_records(vec![
            record! { "z" => 1, "y" => 2 },
            record! { "x" => 3 },
        ]);
        assert_eq!(set.first_record_keys(), vec!["z", "y"]);
        assert!(RecordSet::new().first_record_keys().is_empty());
    }

    #[test]
    fn test_record_macro_keeps_order() {
        let r = record! { "one" => 1, "two" => "2", "three" => true };
        let keys: Vec<&String> = r.keys().collect();
        assert_eq!(keys, vec!["one", "two", "three"]);
        assert_eq!(r["three"], Value::Bool(true));
    }

    #[test]
    fn test_collect_and_iterate() {
        let set: RecordSet = (0..3).map(|i| record! { "i" => i }).collect();
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
        let total: i32 = set
            .iter()
            .filter_map(|r| match r.get("i") {
                Some(Value::Int(i)) => Some(*i),
                _ => None,
            })
            .sum();
        assert_eq!(total, 3);
    }
}
