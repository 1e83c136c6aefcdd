//! Subcommand handlers

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::{create_default_config_file, validate_config, Config};
use anyhow::{anyhow, bail, Context, Result};
use rayon::prelude::*;
use serde_json::json;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tabconv_formats::{convert, prepare_binary, read_records, ConvertOptions, DataFormat};

const STDIO: &str = "-";

/// Where converted bytes go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Standard output
    Stdout,
    /// A file on disk
    File(PathBuf),
}

/// One planned conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Input path, `-` for stdin
    pub input: PathBuf,
    /// Source format
    pub from: DataFormat,
    /// Destination
    pub target: Target,
}

/// Dispatch a parsed command line
pub fn run(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Convert {
            inputs,
            to,
            from,
            output,
            out_dir,
            ..
        } => {
            let jobs = plan_jobs(&inputs, from, to, output.as_deref(), out_dir.as_deref())?;
            convert_all(&jobs, to, config)
        }
        Commands::Schema { input, from, .. } => print_schema(&input, from, config),
        Commands::Config { command } => handle_config_command(command, config),
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}

fn source_format(input: &Path, from: Option<DataFormat>) -> Result<DataFormat> {
    if let Some(format) = from {
        return Ok(format);
    }
    if is_stdio(input) {
        bail!("reading from stdin needs an explicit format: --from <FORMAT>");
    }
    DataFormat::from_path(input).map_err(|_| {
        anyhow!(
            "cannot determine input format for '{}'\n\n\
            Try specifying the format explicitly:\n  \
            tabconv convert {} --from csv --to <FORMAT>",
            input.display(),
            input.display()
        )
    })
}

fn output_name(input: &Path, to: DataFormat) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("cannot derive an output name from '{}'", input.display()))?;
    let mut name = PathBuf::from(stem);
    name.set_extension(to.default_extension());
    Ok(name)
}

/// Resolve source formats and destinations for every input
///
/// With `-o` there must be exactly one input. With `--out-dir` each output is
/// named after its input. Otherwise each output lands next to its input with
/// the target extension, and stdin goes to stdout.
pub fn plan_jobs(
    inputs: &[PathBuf],
    from: Option<DataFormat>,
    to: DataFormat,
    output: Option<&Path>,
    out_dir: Option<&Path>,
) -> Result<Vec<Job>> {
    if output.is_some() && inputs.len() > 1 {
        bail!("--output takes a single input; use --out-dir for several");
    }
    if inputs.len() > 1 && inputs.iter().any(|input| is_stdio(input)) {
        bail!("stdin cannot be combined with other inputs");
    }

    inputs
        .iter()
        .map(|input| -> Result<Job> {
            let from = source_format(input, from)?;
            let target = match (output, out_dir) {
                (Some(path), _) if is_stdio(path) => Target::Stdout,
                (Some(path), _) => Target::File(path.to_path_buf()),
                (None, _) if is_stdio(input) => Target::Stdout,
                (None, Some(dir)) => Target::File(dir.join(output_name(input, to)?)),
                (None, None) => Target::File(input.with_extension(to.default_extension())),
            };
            if let Target::File(path) = &target {
                if path == input {
                    bail!("output would overwrite its own input: {}", input.display());
                }
            }
            Ok(Job {
                input: input.clone(),
                from,
                target,
            })
        })
        .collect()
}

/// Read an input, enforcing the configured size limit
pub fn read_input(input: &Path, max_input_size: Option<u64>) -> Result<Vec<u8>> {
    let data = if is_stdio(input) {
        let mut data = Vec::new();
        io::stdin()
            .read_to_end(&mut data)
            .context("failed to read stdin")?;
        data
    } else {
        if let Some(limit) = max_input_size {
            let len = fs::metadata(input)
                .with_context(|| format!("failed to read {}", input.display()))?
                .len();
            if len > limit {
                bail!(
                    "{} is {len} bytes, over the {limit} byte input limit",
                    input.display()
                );
            }
        }
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?
    };

    if let Some(limit) = max_input_size {
        if data.len() as u64 > limit {
            bail!("input is over the {limit} byte input limit");
        }
    }
    Ok(data)
}

fn run_job(job: &Job, to: DataFormat, options: &ConvertOptions, config: &Config) -> Result<()> {
    if let Target::File(path) = &job.target {
        if path.exists() && !config.io.overwrite {
            bail!(
                "output file already exists: {}\n\n\
                Use --overwrite to replace it",
                path.display()
            );
        }
    }

    let data = read_input(&job.input, config.io.max_input_size)?;
    let output = convert(data, job.from, to, options)
        .with_context(|| format!("failed to convert {}", job.input.display()))?;

    match &job.target {
        Target::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
        }
        Target::File(path) => {
            fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("converted {} to {}", job.input.display(), path.display());
        }
    }
    Ok(())
}

/// Run every job, in parallel when there are several
pub fn convert_all(jobs: &[Job], to: DataFormat, config: &Config) -> Result<()> {
    let options = config.to_convert_options()?;

    if let [job] = jobs {
        return run_job(job, to, &options, config);
    }

    let failures: Vec<(PathBuf, anyhow::Error)> = jobs
        .par_iter()
        .filter_map(|job| {
            run_job(job, to, &options, config)
                .err()
                .map(|e| (job.input.clone(), e))
        })
        .collect();

    for (input, error) in &failures {
        log::error!("{}: {error:#}", input.display());
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} conversions failed",
            failures.len(),
            jobs.len()
        ))
    }
}

/// Schema a binary write of `input` would use, as JSON
pub fn schema_report(
    data: Vec<u8>,
    from: DataFormat,
    options: &ConvertOptions,
) -> Result<serde_json::Value> {
    let records = read_records(data, from, options)?;
    let (_, schema) = prepare_binary(&records)?;

    let columns: Vec<serde_json::Value> = schema
        .fields()
        .iter()
        .map(|field| {
            json!({
                "column": field.column,
                "name": field.name,
                "type": field.field_type,
            })
        })
        .collect();

    Ok(json!({
        "records": records.len(),
        "columns": columns,
        "avro": schema.to_avro_json(),
    }))
}

fn print_schema(input: &Path, from: Option<DataFormat>, config: &Config) -> Result<()> {
    let from = source_format(input, from)?;
    let data = read_input(input, config.io.max_input_size)?;
    let report = schema_report(data, from, &config.to_convert_options()?)
        .with_context(|| format!("failed to infer schema of {}", input.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_config_command(command: ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let toml = toml::to_string_pretty(config).context("failed to serialize config")?;
            println!("{toml}");
            Ok(())
        }
        ConfigCommands::Init { path, force } => {
            if path.exists() && !force {
                bail!(
                    "config file already exists: {}\n\n\
                    Use --force to overwrite:\n  \
                    tabconv config init {} --force",
                    path.display(),
                    path.display()
                );
            }
            create_default_config_file(&path)?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
        ConfigCommands::Check { path } => {
            let check_config = Config::load_from_file(&path)?;
            validate_config(&check_config)?;
            println!("Config file is valid: {}", path.display());
            Ok(())
        }
    }
}
