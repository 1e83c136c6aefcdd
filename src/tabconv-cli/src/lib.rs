//! tabconv-cli library
//!
//! Provides the argument parser, configuration and subcommand handlers behind
//! the `tabconv` binary.

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{parse_args, Cli, CliConfig};
pub use commands::run;
pub use config::Config;
