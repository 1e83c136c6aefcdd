//! Command-line interface for tabconv
//!
//! Argument parsing with clap, plus [`CliConfig`], the subset of flags that
//! override configuration values.

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;
use tabconv_formats::DataFormat;
use tabconv_shared::BuildInfo;

/// tabconv - convert tabular data between CSV, JSON, XML, Parquet and Avro
///
/// Text inputs are read as loosely typed records. Binary outputs get column
/// types inferred from the data and an embedded nullable Avro schema.
#[derive(Parser, Debug)]
#[command(name = "tabconv")]
#[command(author, version, about)]
#[command(after_help = "EXAMPLES:\n  \
    # Convert a CSV file to Parquet next to the input\n  \
    tabconv convert people.csv --to parquet\n\n  \
    # Convert several files in parallel into a directory\n  \
    tabconv convert a.json b.json --to avro --out-dir out/\n\n  \
    # Read stdin, write stdout\n  \
    cat data.xml | tabconv convert - --from xml --to json -o -\n\n  \
    # Show the schema a binary write would use\n  \
    tabconv schema people.csv")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file to load after the standard locations
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for spooling binary inputs
    #[arg(long, value_name = "DIR", global = true)]
    pub scratch_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert files between formats
    #[command(after_help = "EXAMPLES:\n  \
        tabconv convert input.csv --to parquet -o output.parquet\n  \
        tabconv convert data.json --to csv --overwrite")]
    Convert {
        /// Input files, `-` for stdin
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        to: DataFormat,

        /// Input format (taken from the input extension if not specified)
        #[arg(short, long, value_enum)]
        from: Option<DataFormat>,

        /// Output file, `-` for stdout; only with a single input
        #[arg(short, long, value_name = "FILE", conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Directory for output files, named after their inputs
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Overwrite existing output files
        #[arg(long)]
        overwrite: bool,

        /// CSV field separator
        #[arg(long, value_name = "CHAR")]
        separator: Option<String>,

        /// Parquet compression codec
        #[arg(long, value_name = "CODEC")]
        compression: Option<String>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the inferred schema of a file
    #[command(after_help = "EXAMPLES:\n  \
        tabconv schema data.csv\n  \
        tabconv schema - --from json < data.json")]
    Schema {
        /// Input file, `-` for stdin
        input: PathBuf,

        /// Input format (taken from the input extension if not specified)
        #[arg(short, long, value_enum)]
        from: Option<DataFormat>,

        /// CSV field separator
        #[arg(long, value_name = "CHAR")]
        separator: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init {
        /// Path to create config file
        #[arg(default_value = "tabconv.toml")]
        path: PathBuf,

        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration file
    Check {
        /// Configuration file to check
        path: PathBuf,
    },
}

/// Flags that override configuration values
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `-v` count
    pub verbose: u8,
    /// Scratch directory
    pub scratch_dir: Option<PathBuf>,
    /// CSV separator
    pub separator: Option<String>,
    /// Parquet compression
    pub compression: Option<String>,
    /// Compact JSON
    pub compact: bool,
    /// Overwrite outputs
    pub overwrite: bool,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        let mut config = CliConfig {
            verbose: cli.verbose,
            scratch_dir: cli.scratch_dir.clone(),
            ..CliConfig::default()
        };

        match &cli.command {
            Commands::Convert {
                overwrite,
                separator,
                compression,
                compact,
                ..
            } => {
                config.overwrite = *overwrite;
                config.separator.clone_from(separator);
                config.compression.clone_from(compression);
                config.compact = *compact;
            }
            Commands::Schema { separator, .. } => {
                config.separator.clone_from(separator);
            }
            Commands::Config { .. } => {}
        }

        config
    }
}

/// Version and build details of this binary
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: tabconv_shared::VERSION,
        git_hash: option_env!("GIT_HASH"),
        build_date: option_env!("BUILD_DATE"),
        rust_version: option_env!("RUSTC_VERSION"),
        formats: &["csv", "json", "xml", "parquet", "avro"],
    }
}

/// Clap command with build details behind `--version`
fn command() -> clap::Command {
    Cli::command().long_version(build_info().long_version())
}

/// Parse command-line arguments
pub fn parse_args() -> Cli {
    let matches = command().get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

/// Parse command-line arguments from a vector (for testing)
pub fn parse_args_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}
