use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Scratch storage for a single conversion
///
/// Without a directory everything stays in memory. With one, binary inputs are
/// spooled to a temporary file there and decoded from disk. Files are removed
/// when the returned handle is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratch {
    dir: Option<PathBuf>,
}

impl Scratch {
    /// Keep everything in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Spool binary inputs to files under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Configured directory, if any
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Move `bytes` into a scratch file, or hand them back when in memory
    pub fn spool(&self, bytes: Vec<u8>) -> Result<Spooled> {
        let Some(dir) = &self.dir else {
            return Ok(Spooled::Memory(bytes));
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.flush()?;
        log::debug!(
            "spooled {} bytes to {}",
            bytes.len(),
            file.path().display()
        );
        drop(bytes);
        Ok(Spooled::File(file))
    }
}

/// Input after [`Scratch::spool`]
#[derive(Debug)]
pub enum Spooled {
    /// Still held in memory
    Memory(Vec<u8>),
    /// Written to a temporary file
    File(NamedTempFile),
}
