//! tabconv: schema-inferring conversion between tabular formats
//!
//! Text formats (CSV, JSON, XML) are read into a loosely typed record model.
//! Writing to a binary format (Parquet, Avro) infers a column type for every
//! column, coerces the cells and embeds a nullable Avro schema.
//!
//! This crate re-exports the engine from `tabconv-formats` and the record
//! model from `tabconv-shared`.
//!
//! ```
//! use tabconv::{convert, ConvertOptions, DataFormat};
//!
//! let json = br#"[{"id":"1","score":"3.5","active":"true"}]"#.to_vec();
//! let parquet = convert(json, DataFormat::Json, DataFormat::Parquet, &ConvertOptions::default())?;
//! assert_eq!(&parquet[..4], b"PAR1");
//! # Ok::<(), tabconv::Error>(())
//! ```

pub use tabconv_formats::*;
pub use tabconv_shared::record;

/// Canonical record model
pub mod shared {
    pub use tabconv_shared::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reexports_round_trip() {
        let records = RecordSet::from_records(vec![record! { "id" => 1, "name" => "a" }]);
        let options = ConvertOptions::default();
        let avro = write_records(&records, DataFormat::Avro, &options).unwrap();
        let back = read_records(avro, DataFormat::Avro, &options).unwrap();
        assert_eq!(back, records);
        assert!(!VERSION.is_empty());
    }
}
