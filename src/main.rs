//! CLI entry point for the bike-station ETL.
//!
//! Fetches live station occupancy, cleans it, counts nearby metro stations and
//! bus stops from static GTFS data, and replaces the stored station table.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use velo_etl::{
    config::{DEFAULT_FEED_ENDPOINT, PipelineConfig},
    error::PipelineError,
    feed::parse_station_feed,
    gtfs::load_reference_points,
    infra::source_for,
    output::{CsvSink, StationSink, write_clean_stations},
    pipeline::run_pipeline,
    report::QualityReport,
    transform::normalize_feed,
};

#[derive(Parser)]
#[command(name = "velo_etl")]
#[command(about = "Bike-share station ETL with transit proximity enrichment", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Station feed URL, or a path to a saved JSON payload
    #[arg(long, env = "VELO_FEED_ENDPOINT", default_value = DEFAULT_FEED_ENDPOINT, global = true)]
    feed_endpoint: String,

    /// Bike-share contract (region) to request
    #[arg(long, env = "VELO_CONTRACT", default_value = "toulouse", global = true)]
    contract: String,

    /// API key for the station feed
    #[arg(long, env = "JCDECAUX_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Timeout for the station feed request, in seconds
    #[arg(long, env = "VELO_FEED_TIMEOUT", default_value_t = 30, global = true)]
    feed_timeout_seconds: u64,

    /// Timeout for a whole pipeline run, in seconds
    #[arg(long, env = "VELO_RUN_TIMEOUT", default_value_t = 300, global = true)]
    run_timeout_seconds: u64,

    /// Directory holding stops.txt, routes.txt, trips.txt and stop_times.txt
    #[arg(long, env = "VELO_GTFS_DIR", default_value = "data/tisseo_gtfs", global = true)]
    reference_data_path: PathBuf,

    /// Radius for counting nearby metro stations, in meters
    #[arg(long, env = "VELO_METRO_RADIUS", default_value_t = 500.0, global = true)]
    metro_radius_m: f64,

    /// Radius for counting nearby bus stops, in meters
    #[arg(long, env = "VELO_BUS_RADIUS", default_value_t = 200.0, global = true)]
    bus_radius_m: f64,

    /// CSV table replaced on every run
    #[arg(long, env = "VELO_SINK", default_value = "data/stations_enriched.csv", global = true)]
    sink_connection: PathBuf,

    /// Optional path to save the raw feed payload to
    #[arg(long, env = "VELO_RAW_SNAPSHOT", global = true)]
    raw_snapshot_path: Option<PathBuf>,
}

impl From<ConfigArgs> for PipelineConfig {
    fn from(args: ConfigArgs) -> Self {
        PipelineConfig {
            feed_endpoint: args.feed_endpoint,
            contract: args.contract,
            api_key: args.api_key,
            feed_timeout_seconds: args.feed_timeout_seconds,
            run_timeout_seconds: args.run_timeout_seconds,
            reference_data_path: args.reference_data_path,
            metro_radius_m: args.metro_radius_m,
            bus_radius_m: args.bus_radius_m,
            sink_connection: args.sink_connection,
            raw_snapshot_path: args.raw_snapshot_path,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract → clean → enrich → load pipeline
    Run,
    /// Clean a feed payload from a file or URL and write the cleaned CSV
    Clean {
        /// Path to file or URL to fetch (defaults to the configured feed)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// CSV file to write cleaned stations to
        #[arg(short, long, default_value = "data/stations_cleaned.csv")]
        output: PathBuf,
    },
    /// Extract the metro and bus reference points from the GTFS directory
    ExtractStops {
        /// Number of points to print per mode
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Check that the station feed answers and count its stations
    CheckFeed,
    /// Summarize what the stored station table holds
    Verify {
        /// Number of sample rows to print
        #[arg(short, long, default_value_t = 3)]
        sample: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/velo_etl.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("velo_etl.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from(cli.config);
    config.validate()?;

    match cli.command {
        Commands::Run => {
            let source = source_for(&config)?;
            let sink = CsvSink::new(&config.sink_connection);
            let run = run_pipeline(&config, source.as_ref(), &sink);

            let report = tokio::time::timeout(config.run_timeout(), run)
                .await
                .map_err(|_| PipelineError::Timeout(config.run_timeout_seconds))??;
            report.print_json()?;

            if report.rows_loaded > 0 {
                verify(&sink, 3)?;
            }
        }
        Commands::Clean { source, output } => {
            let config = PipelineConfig {
                feed_endpoint: source.unwrap_or(config.feed_endpoint.clone()),
                ..config
            };
            let bytes = source_for(&config)?.fetch_raw().await?;
            let feed = parse_station_feed(&bytes)?;
            let normalized = normalize_feed(&feed, Utc::now());
            normalized.report.log();
            QualityReport::from_stations(&normalized.stations).log();

            if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            write_clean_stations(std::fs::File::create(&output)?, &normalized.stations)?;
            info!(path = %output.display(), rows = normalized.stations.len(), "Cleaned stations written");
        }
        Commands::ExtractStops { limit } => {
            let extraction = load_reference_points(&config.reference_data_path);
            extraction.report.log();
            for degradation in &extraction.degradations {
                warn!(?degradation, "Reference extraction degraded");
            }

            for (label, points) in [("metro", &extraction.sets.metro), ("bus", &extraction.sets.bus)] {
                info!(mode = label, total = points.len(), "Unique reference points");
                for p in points.iter().take(limit) {
                    info!(mode = label, name = %p.name, lat = p.position.lat, lon = p.position.lon, "Reference point");
                }
            }
        }
        Commands::CheckFeed => {
            let source = source_for(&config)?;
            match source.fetch_raw().await {
                Ok(bytes) => {
                    let feed = parse_station_feed(&bytes)?;
                    info!(source = %source.describe(), stations = feed.len(), "Station feed reachable");
                }
                Err(e) => {
                    warn!(source = %source.describe(), error = %format!("{e:#}"), "Station feed unreachable");
                    return Err(e);
                }
            }
        }
        Commands::Verify { sample } => {
            verify(&CsvSink::new(&config.sink_connection), sample)?;
        }
    }

    Ok(())
}

/// Logs the stored row count, a few sample rows and the best-stocked stations.
fn verify(sink: &dyn StationSink, sample: usize) -> Result<()> {
    let summary = sink.summary(sample)?;
    info!(rows = summary.row_count, "Stations in stored table");
    for s in &summary.sample {
        info!(name = %s.name, address = %s.address, available_bikes = ?s.available_bikes, "Sample station");
    }
    for s in &summary.top_by_available_bikes {
        info!(name = %s.name, available_bikes = ?s.available_bikes, "Top station by available bikes");
    }
    Ok(())
}
