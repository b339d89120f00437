//! Checks a coverwatchd config file and prints the settings the service
//! would run with.
//!
//! Exit status: 0 when the file is valid, 1 when it is missing or rejected.

use clap::Parser;
use coverwatch_config::{load_config, ConfigError, ServiceConfig, CURRENT_CONFIG_VERSION};
use coverwatch_util::{default_config_path, format_duration, COVERWATCH_CONFIG_ENV};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "validate-config")]
#[command(about = "Validate a coverwatchd configuration file", long_about = None)]
struct Args {
    /// Config file to check
    #[arg(env = COVERWATCH_CONFIG_ENV, default_value_os_t = default_config_path())]
    path: PathBuf,
}

fn print_effective(config: &ServiceConfig) {
    println!("config_version          = {}", CURRENT_CONFIG_VERSION);
    println!("data_dir                = {}", config.data_dir.display());
    println!(
        "check_interval_seconds  = {} ({})",
        config.check_interval.as_secs(),
        format_duration(config.check_interval)
    );
    println!(
        "recency_window_seconds  = {} ({})",
        config.recency_window.as_secs(),
        format_duration(config.recency_window)
    );
}

fn describe(err: &ConfigError) -> Vec<String> {
    match err {
        ConfigError::ValidationFailed { errors } => {
            errors.iter().map(ToString::to_string).collect()
        }
        ConfigError::UnsupportedVersion(found) => vec![format!(
            "config_version {} is not supported, this build reads version {}",
            found, CURRENT_CONFIG_VERSION
        )],
        other => vec![other.to_string()],
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if !args.path.is_file() {
        eprintln!("{}: no such config file", args.path.display());
        return ExitCode::FAILURE;
    }

    match load_config(&args.path) {
        Ok(config) => {
            println!("{}: ok", args.path.display());
            print_effective(&config);
            ExitCode::SUCCESS
        }
        Err(e) => {
            for problem in describe(&e) {
                eprintln!("{}: {}", args.path.display(), problem);
            }
            ExitCode::FAILURE
        }
    }
}
