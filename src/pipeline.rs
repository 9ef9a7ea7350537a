//! One batch run: fetch → clean → enrich → load.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::enrich::{Enrichment, enrich_stations};
use crate::feed::{ParsedFeed, parse_station_feed};
use crate::gtfs::{Extraction, load_reference_points};
use crate::output::StationSink;
use crate::report::{Degradation, QualityReport, RunReport};
use crate::services::StationSource;
use crate::transform::{Normalized, normalize_feed};

/// Fetches the raw station payload, treating any failure or timeout as
/// unavailable data rather than an error.
async fn fetch_feed<S: StationSource + ?Sized>(
    config: &PipelineConfig,
    source: &S,
    report: &mut RunReport,
) -> Option<Vec<u8>> {
    let fetched = tokio::time::timeout(config.feed_timeout(), source.fetch_raw()).await;
    let reason = match fetched {
        Ok(Ok(bytes)) => return Some(bytes),
        Ok(Err(e)) => format!("{e:#}"),
        Err(_) => format!("no response within {}s", config.feed_timeout_seconds),
    };
    warn!(source = %source.describe(), %reason, "Station feed unavailable");
    report.degrade(Degradation::StationFeedUnavailable { reason });
    None
}

async fn write_snapshot(config: &PipelineConfig, bytes: &[u8]) -> Result<()> {
    let Some(path) = &config.raw_snapshot_path else {
        return Ok(());
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write raw snapshot {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Raw feed snapshot saved");
    Ok(())
}

/// Runs the full batch and reports what happened.
///
/// Data-availability problems (feed down, GTFS files missing, empty reference
/// sets) degrade the run and are listed in the report. Structural problems with
/// the feed payload, invalid configuration and sink failures are returned as
/// errors, in which case nothing has been committed.
#[tracing::instrument(skip_all, fields(source = %source.describe()))]
pub async fn run_pipeline<S, K>(config: &PipelineConfig, source: &S, sink: &K) -> Result<RunReport>
where
    S: StationSource + ?Sized,
    K: StationSink + ?Sized,
{
    config.validate()?;
    let mut report = RunReport::start();

    info!("Extracting station data");
    let feed = match fetch_feed(config, source, &mut report).await {
        Some(bytes) => {
            if let Err(e) = write_snapshot(config, &bytes).await {
                warn!(error = %format!("{e:#}"), "Could not save raw snapshot");
            }
            parse_station_feed(&bytes)?
        }
        None => ParsedFeed::default(),
    };
    info!(stations = feed.len(), "Station feed decoded");

    // Cleaning, GTFS loading and the proximity join are blocking work.
    let worker_config = config.clone();
    let (normalized, extraction, enrichment) = tokio::task::spawn_blocking(move || {
        transform(&worker_config, &feed)
    })
    .await
    .context("transform worker panicked")?;

    report.push_stage(normalized.report);
    let quality = QualityReport::from_stations(&normalized.stations);
    quality.log();
    report.quality = Some(quality);
    if normalized.stations.is_empty() {
        report.degrade(Degradation::EmptyStationBatch);
    }

    report.push_stage(extraction.report);
    report.push_stage(enrichment.report);
    for degradation in extraction
        .degradations
        .into_iter()
        .chain(enrichment.degradations)
    {
        if !report.degradations.contains(&degradation) {
            report.degrade(degradation);
        }
    }

    info!("Loading station table");
    if enrichment.table.is_empty() {
        warn!("No stations to load, keeping the existing table");
    } else {
        report.rows_loaded = sink.replace_all(&enrichment.table)?;
    }

    let report = report.finish();
    info!(
        rows_loaded = report.rows_loaded,
        degraded = report.is_degraded(),
        "Pipeline run complete"
    );
    Ok(report)
}

/// The CPU-bound part of a run.
pub fn transform(config: &PipelineConfig, feed: &ParsedFeed) -> (Normalized, Extraction, Enrichment) {
    let normalized = normalize_feed(feed, Utc::now());
    let extraction = load_reference_points(&config.reference_data_path);
    let enrichment = enrich_stations(&normalized.stations, &extraction.sets, &config.enrichment());
    (normalized, extraction, enrichment)
}
