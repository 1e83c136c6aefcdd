//! tabconv-shared: Canonical record model for tabconv
//!
//! Every format conversion passes through the types defined here. Readers
//! build a [`RecordSet`], writers consume one.
//!
//! # Features
//!
//! - **Tagged cell values**: [`Value`] covers every scalar a reader can produce
//! - **Ordered records**: field insertion order is preserved for positional writers
//! - **Column union**: [`RecordSet::columns`] reports first-seen column order
//! - **Version Information**: Build and version metadata

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information structure
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Package version
    pub version: &'static str,
    /// Git commit hash (if available)
    pub git_hash: Option<&'static str>,
    /// Build timestamp (if available)
    pub build_date: Option<&'static str>,
    /// Rust compiler version (if available)
    pub rust_version: Option<&'static str>,
    /// Supported formats
    pub formats: &'static [&'static str],
}

impl BuildInfo {
    /// Version followed by the optional build details, one per line
    #[must_use]
    pub fn long_version(&self) -> String {
        let mut out = self.version.to_string();

        if let Some(hash) = self.git_hash {
            out.push_str(&format!("\nGit hash: {hash}"));
        }

        if let Some(date) = self.build_date {
            out.push_str(&format!("\nBuilt: {date}"));
        }

        if let Some(rust_ver) = self.rust_version {
            out.push_str(&format!("\nRust: {rust_ver}"));
        }

        if !self.formats.is_empty() {
            out.push_str(&format!("\nFormats: {}", self.formats.join(", ")));
        }

        out
    }
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "tabconv {}", self.long_version())
    }
}

/// Cell values
pub mod value;

/// Records and record sets
pub mod record;

pub use record::{Record, RecordSet};
pub use value::Value;
