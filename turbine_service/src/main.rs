/// Command line entry point.
///
/// `ingest` (re)loads the configured turbine exports; the remaining commands
/// query the stored readings and print JSON to stdout. Exit codes: 0 success,
/// 1 failure, 2 no data for the query, 3 invalid query parameter.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use turbine_service::analysis;
use turbine_service::config::{self, ServiceConfig};
use turbine_service::error::QueryError;
use turbine_service::ingest::{self, IngestOptions};
use turbine_service::logging;
use turbine_service::model::{DEFAULT_BIN_INTERVAL, TimeRange};
use turbine_service::store::{MemoryStore, PgStore, ReadingStore};

#[derive(Parser, Debug)]
#[command(name = "turbine_service", version, about = "Wind turbine telemetry ingestion and analytics")]
struct Cli {
    /// Service configuration file
    #[arg(long, global = true, env = "TURBINE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Window {
    /// Inclusive lower bound, e.g. 2016-01-01 or "2016-01-01 06:00:00"
    #[arg(long, value_parser = parse_time)]
    start: Option<NaiveDateTime>,

    /// Inclusive upper bound
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveDateTime>,
}

impl Window {
    fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download, normalize and store turbine exports
    Ingest {
        /// Restrict the run to these source ids (repeatable)
        #[arg(long = "source")]
        sources: Vec<i32>,

        /// Re-download exports even when cached
        #[arg(long)]
        refresh: bool,

        /// Run the pipeline against an in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// List configured sources with their stored coverage
    Sources,

    /// Raw readings of one source
    Range {
        source_id: i32,
        #[command(flatten)]
        window: Window,
        /// Maximum number of readings (1..=10000)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Average power per wind speed bin
    PowerCurve {
        source_id: i32,
        #[command(flatten)]
        window: Window,
        /// Bin width in m/s
        #[arg(long, default_value_t = DEFAULT_BIN_INTERVAL)]
        interval: f64,
    },

    /// Summary statistics of one source
    Stats {
        source_id: i32,
        #[command(flatten)]
        window: Window,
    },

    /// Check that the database answers
    Health,
}

fn parse_time(value: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("unrecognized timestamp '{value}'"))
}

fn open_store(config: &ServiceConfig) -> anyhow::Result<PgStore> {
    let url = config::database_url()?;
    let store = PgStore::new(&url, config.settings.store_timeout())
        .context("invalid DATABASE_URL")?;
    Ok(store)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli, config: ServiceConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Ingest { sources, refresh, dry_run } => {
            let selected = config.select_sources(&sources)?;
            let http = ingest::http_client(&config.settings)?;
            let options = IngestOptions { refresh };

            let report = if dry_run {
                info!("dry run, readings are kept in memory only");
                ingest::run_ingestion(&mut MemoryStore::new(), &http, &config, &selected, options)?
            } else {
                let mut store = open_store(&config)?;
                ingest::run_ingestion(&mut store, &http, &config, &selected, options)?
            };
            print_json(&report)
        }
        Command::Sources => {
            let mut store = open_store(&config)?;
            let overview = analysis::source_overview(&mut store, &config.sources)?;
            print_json(&overview)
        }
        Command::Range { source_id, window, limit } => {
            let mut store = open_store(&config)?;
            let limit = limit.unwrap_or(config.settings.default_limit);
            let series = analysis::get_range(&mut store, source_id, &window.range(), limit)?;
            print_json(&series)
        }
        Command::PowerCurve { source_id, window, interval } => {
            let mut store = open_store(&config)?;
            let curve = analysis::compute_power_curve(&mut store, source_id, &window.range(), interval)?;
            print_json(&curve)
        }
        Command::Stats { source_id, window } => {
            let mut store = open_store(&config)?;
            let stats = analysis::compute_statistics(&mut store, source_id, &window.range())?;
            print_json(&stats)
        }
        Command::Health => {
            let mut store = open_store(&config)?;
            analysis::health(&mut store).context("database is not reachable")?;
            store.ensure_indexes()?;
            print_json(&serde_json::json!({ "status": "ok" }))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<QueryError>() {
        Some(QueryError::NoData { .. }) => 2,
        Some(QueryError::InvalidParameter(_)) => 3,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServiceConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.settings.log_level);
    if let Err(e) = logging::init_logging(level, config.settings.log_file.as_deref()) {
        eprintln!("could not open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            if code == 2 {
                info!("{e}");
            } else {
                error!("{e:#}");
            }
            eprintln!("{e:#}");
            ExitCode::from(code)
        }
    }
}
