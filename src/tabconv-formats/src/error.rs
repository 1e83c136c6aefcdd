use crate::format::DataFormat;
use std::fmt::Display;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tabconv conversions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source stream held no bytes, or only whitespace
    #[error("failed to read {}: input is empty", .format.label())]
    EmptyInput {
        /// Declared source format
        format: DataFormat,
    },

    /// The source bytes do not parse as the declared format
    #[error("failed to read {}: {source}", .format.label())]
    Format {
        /// Declared source format
        format: DataFormat,
        /// What went wrong
        source: FormatError,
    },

    /// A writer could not encode the record set
    #[error("failed to encode {}: {source}", .format.label())]
    Encode {
        /// Target format
        format: DataFormat,
        /// What went wrong
        source: FormatError,
    },

    /// A writer was handed a record set with no records
    #[error("nothing to write to {}: record set is empty", .format.label())]
    EmptyRecordSet {
        /// Target format
        format: DataFormat,
    },

    /// A schema cannot be derived from the record set
    #[error("schema inference failed: {0}")]
    SchemaInference(String),

    /// A writer-stage failure, tagged with both ends of the conversion
    #[error("failed to write {} (from {}): {source}", .to.label(), .from.label())]
    Conversion {
        /// Source format
        from: DataFormat,
        /// Target format
        to: DataFormat,
        /// Underlying cause
        source: Box<Error>,
    },

    /// I/O errors (scratch files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors describing why bytes are not valid for a format
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The document is not well-formed
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The document is well-formed but not tabular in the expected way
    #[error("unexpected shape: {0}")]
    Shape(String),

    /// A construct the engine does not handle
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Encoding or decoding at the binary layer failed
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Create a format error for the given source format
    pub fn format(format: DataFormat, source: FormatError) -> Self {
        Error::Format { format, source }
    }

    /// Create an encoding error for the given target format
    pub fn encode(format: DataFormat, cause: impl Display) -> Self {
        Error::Encode {
            format,
            source: FormatError::Encoding(cause.to_string()),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Wrap a writer-stage failure with both formats
    pub fn conversion(from: DataFormat, to: DataFormat, source: Error) -> Self {
        Error::Conversion {
            from,
            to,
            source: Box::new(source),
        }
    }

    /// Innermost error, looking through conversion wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Conversion { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure was caused by the input rather than by the writer
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            Error::EmptyInput { .. } | Error::Format { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        let source = if e.is_syntax() || e.is_eof() {
            FormatError::Syntax(e.to_string())
        } else {
            FormatError::Shape(e.to_string())
        };
        Error::format(DataFormat::Json, source)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        match e.kind() {
            csv::ErrorKind::Utf8 { .. } => {
                Error::format(DataFormat::Csv, FormatError::Encoding(e.to_string()))
            }
            _ => Error::format(DataFormat::Csv, FormatError::Syntax(e.to_string())),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::format(DataFormat::Xml, FormatError::Syntax(e.to_string()))
    }
}

impl From<apache_avro::Error> for Error {
    fn from(e: apache_avro::Error) -> Self {
        Error::format(DataFormat::Avro, FormatError::Encoding(e.to_string()))
    }
}

impl From<parquet::errors::ParquetError> for Error {
    fn from(e: parquet::errors::ParquetError) -> Self {
        Error::format(DataFormat::Parquet, FormatError::Encoding(e.to_string()))
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(e: arrow::error::ArrowError) -> Self {
        Error::format(DataFormat::Parquet, FormatError::Encoding(e.to_string()))
    }
}
