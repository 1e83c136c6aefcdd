use std::process;

use tabconv_cli::cli::{parse_args, CliConfig};
use tabconv_cli::config::Config;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args();
    let cli_config = CliConfig::from(&args);

    let mut config = Config::load()?;
    if let Some(config_path) = &args.config {
        config.merge_file(config_path)?;
    }
    config.apply_cli(&cli_config);

    setup_logging(&config);
    log::debug!("tabconv {}", tabconv_shared::VERSION);

    tabconv_cli::run(args, &config)
}

fn setup_logging(config: &Config) {
    let log_level = match config.debug.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new().filter_level(log_level).init();
}
