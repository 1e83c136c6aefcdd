//! Conversion between declared formats
//!
//! A conversion is a read followed by a write. Formats are taken as declared;
//! nothing is sniffed from the content. Reader failures surface unchanged,
//! writer failures are wrapped in [`Error::Conversion`] so the message names
//! both sides.

use crate::error::{Error, Result};
use crate::format::DataFormat;
use crate::reader::{deserialize, ReadOptions};
use crate::scratch::Scratch;
use crate::writer::{serialize, WriteOptions};
use tabconv_shared::RecordSet;

/// Options for a whole conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Reader settings
    pub read: ReadOptions,
    /// Writer settings
    pub write: WriteOptions,
    /// Where binary inputs are spooled
    pub scratch: Scratch,
}

impl ConvertOptions {
    /// Use `scratch` for binary inputs
    pub fn with_scratch(mut self, scratch: Scratch) -> Self {
        self.scratch = scratch;
        self
    }
}

/// Decode `input` into a record set
pub fn read_records(
    input: Vec<u8>,
    from: DataFormat,
    options: &ConvertOptions,
) -> Result<RecordSet> {
    log::debug!("reading {} bytes as {}", input.len(), from.label());
    let records = deserialize(input, from, &options.read, &options.scratch)?;
    log::debug!(
        "read {} records with {} columns from {}",
        records.len(),
        records.columns().len(),
        from.label()
    );
    Ok(records)
}

/// Encode a record set as `to`
pub fn write_records(
    records: &RecordSet,
    to: DataFormat,
    options: &ConvertOptions,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    serialize(&mut buffer, records, to, &options.write)?;
    log::debug!("wrote {} bytes of {}", buffer.len(), to.label());
    Ok(buffer)
}

/// Convert `input` from one format to another
pub fn convert(
    input: Vec<u8>,
    from: DataFormat,
    to: DataFormat,
    options: &ConvertOptions,
) -> Result<Vec<u8>> {
    let records = read_records(input, from, options)?;
    let output =
        write_records(&records, to, options).map_err(|e| Error::conversion(from, to, e))?;
    log::info!(
        "converted {} records from {} to {} ({} bytes)",
        records.len(),
        from.label(),
        to.label(),
        output.len()
    );
    Ok(output)
}
