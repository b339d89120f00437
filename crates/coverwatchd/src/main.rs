//! coverwatchd - The coverwatch background service
//!
//! This is the main entry point for the coverwatch service.
//! It wires together:
//! - Configuration loading
//! - Store initialization
//! - The policy expiration scheduler
//! - One-shot commands for sweeps, validity checks and coverage history

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coverwatch_config::{load_config_or_default, ServiceConfig};
use coverwatch_core::{CoverageQueries, ExpirationScheduler, ExpirationService};
use coverwatch_store::{SqliteStore, Store};
use coverwatch_util::{
    default_config_path, format_duration, parse_mock_time, CarId, COVERWATCH_CONFIG_ENV,
    COVERWATCH_DATA_DIR_ENV, DATABASE_FILENAME, MOCK_TIME_FORMAT,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// coverwatchd - Insurance policy expiration monitoring
#[derive(Parser, Debug)]
#[command(name = "coverwatchd")]
#[command(about = "Insurance policy expiration monitoring", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/coverwatch/config.toml)
    #[arg(short, long, env = COVERWATCH_CONFIG_ENV, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set COVERWATCH_DATA_DIR env var)
    #[arg(short, long, env = COVERWATCH_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the expiration scheduler until SIGTERM/SIGINT (default)
    Run,

    /// Run a single expiration sweep and exit
    Sweep {
        /// Sweep as of this UTC instant instead of now ("YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        at: Option<String>,
    },

    /// Check whether a car is insured on a date, printing the answer as JSON
    Check {
        /// Car identifier
        car_id: i64,

        /// Date to check (YYYY-MM-DD)
        date: Option<String>,
    },

    /// Print a car's coverage history as JSON
    History {
        /// Car identifier
        car_id: i64,
    },
}

fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    let db_path = config.data_dir.join(DATABASE_FILENAME);
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );

    info!(db_path = %db_path.display(), "Store initialized");
    Ok(store)
}

async fn run_service(store: Arc<dyn Store>, config: &ServiceConfig) -> Result<()> {
    let service = ExpirationService::from_config(store, config);
    let handle = ExpirationScheduler::new(service).spawn();

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    info!(
        interval = %format_duration(config.check_interval),
        window = %format_duration(config.recency_window),
        "Service running"
    );

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully");
        }
    }

    handle
        .shutdown()
        .await
        .context("Expiration scheduler task failed")?;

    info!("Shutdown complete");
    Ok(())
}

fn run_sweep(store: Arc<dyn Store>, config: &ServiceConfig, at: Option<&str>) -> Result<()> {
    let now = match at {
        Some(s) => parse_mock_time(s)
            .with_context(|| format!("Invalid --at {:?}, expected {}", s, MOCK_TIME_FORMAT))?,
        None => coverwatch_util::now(),
    };

    let report = ExpirationService::from_config(store, config).run_once(now)?;
    info!(
        sweep_id = %report.sweep_id,
        detected = report.detected,
        recorded = report.recorded.len(),
        "Sweep complete"
    );
    Ok(())
}

fn print_client_error(e: &coverwatch_util::CoverwatchError) -> ExitCode {
    let body = serde_json::json!({ "error": e.to_string() });
    eprintln!("{}", body);
    ExitCode::from(2)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "coverwatchd starting");

    let mut config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }

    let store = open_store(&config)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_service(store, &config).await?,

        Command::Sweep { at } => run_sweep(store, &config, at.as_deref())?,

        Command::Check { car_id, date } => {
            let queries = CoverageQueries::new(store);
            match queries.check_validity(CarId::new(car_id), date.as_deref()) {
                Ok(report) => println!("{}", serde_json::to_string(&report)?),
                Err(e) if e.is_client_error() => return Ok(print_client_error(&e)),
                Err(e) => {
                    error!(error = %e, "Validity check failed");
                    return Err(e.into());
                }
            }
        }

        Command::History { car_id } => {
            let queries = CoverageQueries::new(store);
            match queries.history(CarId::new(car_id)) {
                Ok(items) => println!("{}", serde_json::to_string_pretty(&items)?),
                Err(e) if e.is_client_error() => return Ok(print_client_error(&e)),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
