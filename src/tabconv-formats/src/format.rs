use crate::error::{Error, FormatError, Result};
use std::path::Path;
use std::str::FromStr;

/// Supported data formats for reading and writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DataFormat {
    /// Comma-separated values, header row first
    Csv,
    /// Array of objects, or a single object
    Json,
    /// `records` document of `record` elements
    Xml,
    /// Apache Parquet with an embedded Avro schema
    Parquet,
    /// Apache Avro object container file
    Avro,
}

impl DataFormat {
    /// Every supported format
    pub const ALL: [DataFormat; 5] = [
        DataFormat::Csv,
        DataFormat::Json,
        DataFormat::Xml,
        DataFormat::Parquet,
        DataFormat::Avro,
    ];

    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::config(format!("cannot tell format of {}", path.display())))?;

        Self::from_extension(ext)
    }

    /// Detect format from file extension string
    pub fn from_extension(ext: &str) -> Result<Self> {
        Self::parse(ext)
    }

    /// Parse format from string (for CLI arguments and configuration)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "parquet" | "pq" => Ok(Self::Parquet),
            "avro" => Ok(Self::Avro),
            _ => Err(Error::config(format!("unknown format: {s}"))),
        }
    }

    /// Get the default file extension for this format
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Parquet => "parquet",
            Self::Avro => "avro",
        }
    }

    /// Binary formats need a fixed schema, so writing them runs type inference
    pub fn is_binary(&self) -> bool {
        match self {
            Self::Parquet | Self::Avro => true,
            Self::Csv | Self::Json | Self::Xml => false,
        }
    }

    /// Whether an empty byte stream is a valid, empty document
    pub fn accepts_empty_input(&self) -> bool {
        matches!(self, Self::Csv)
    }

    /// Get human-readable format name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Parquet => "Parquet",
            Self::Avro => "Avro",
        }
    }

    /// Label used in error messages, e.g. `format.json`
    pub fn label(&self) -> String {
        format!("format.{}", self.default_extension())
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).map_err(|e| e.to_string())
    }
}

/// Quick structural check of the first bytes, used to give better errors
pub(crate) fn check_magic(format: DataFormat, bytes: &[u8]) -> Result<()> {
    let (magic, name): (&[u8], &str) = match format {
        DataFormat::Parquet => (b"PAR1", "PAR1"),
        DataFormat::Avro => (b"Obj\x01", "Obj\\x01"),
        _ => return Ok(()),
    };
    if bytes.len() < magic.len() || &bytes[..magic.len()] != magic {
        return Err(Error::format(
            format,
            FormatError::Syntax(format!("missing {name} magic bytes")),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DataFormat::from_extension("csv").unwrap(), DataFormat::Csv);
        assert_eq!(DataFormat::from_extension("CSV").unwrap(), DataFormat::Csv);
        assert_eq!(DataFormat::from_extension("json").unwrap(), DataFormat::Json);
        assert_eq!(DataFormat::from_extension("xml").unwrap(), DataFormat::Xml);
        assert_eq!(
            DataFormat::from_extension("parquet").unwrap(),
            DataFormat::Parquet
        );
        assert_eq!(DataFormat::from_extension("avro").unwrap(), DataFormat::Avro);
        assert!(DataFormat::from_extension("kml").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DataFormat::from_path(Path::new("data/input.json")).unwrap(),
            DataFormat::Json
        );
        assert!(DataFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_from_str_trait() {
        let format: DataFormat = "Parquet".parse().unwrap();
        assert_eq!(format, DataFormat::Parquet);
        assert!("geojson".parse::<DataFormat>().is_err());
    }

    #[test]
    fn test_labels_and_names() {
        assert_eq!(DataFormat::Json.label(), "format.json");
        assert_eq!(DataFormat::Parquet.to_string(), "Parquet");
        for format in DataFormat::ALL {
            assert_eq!(
                DataFormat::from_extension(format.default_extension()).unwrap(),
                format
            );
        }
    }

    #[test]
    fn test_binary_and_empty_input_rules() {
        assert!(DataFormat::Parquet.is_binary());
        assert!(DataFormat::Avro.is_binary());
        assert!(!DataFormat::Csv.is_binary());
        assert!(DataFormat::Csv.accepts_empty_input());
        assert!(!DataFormat::Json.accepts_empty_input());
    }

    #[test]
    fn test_check_magic() {
        assert!(check_magic(DataFormat::Parquet, b"PAR1....").is_ok());
        assert!(check_magic(DataFormat::Parquet, b"nope").is_err());
        assert!(check_magic(DataFormat::Avro, b"Obj\x01rest").is_ok());
        assert!(check_magic(DataFormat::Csv, b"").is_ok());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&DataFormat::Parquet).unwrap();
        assert_eq!(json, "\"parquet\"");
        let parsed: DataFormat = serde_json::from_str("\"xml\"").unwrap();
        assert_eq!(parsed, DataFormat::Xml);
    }
}
