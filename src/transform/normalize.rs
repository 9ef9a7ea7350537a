//! Cleans raw station records into [`CleanStation`]s.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::feed::ParsedFeed;
use crate::model::{CleanStation, Coordinates, StationRecord, StationStatus};
use crate::report::{DropReason, StageReport};

use super::names::normalize_name;

/// Output of the normalization stage.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub stations: Vec<CleanStation>,
    pub report: StageReport,
}

/// Reads `lat`/`lng` out of the nested position object.
///
/// Returns `None` when a sub-key is missing, is not numeric, or is out of range.
pub fn extract_coordinates(position: &Value) -> Option<Coordinates> {
    let lat = position.get("lat")?.as_f64()?;
    let lon = position.get("lng")?.as_f64()?;
    let coords = Coordinates::new(lat, lon);
    coords.is_valid().then_some(coords)
}

fn clean_record(
    record: &StationRecord,
    observed_at: DateTime<Utc>,
) -> Result<CleanStation, DropReason> {
    let position = record
        .position
        .as_ref()
        .filter(|p| !p.is_null())
        .ok_or(DropReason::MissingPosition)?;
    let address = record
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or(DropReason::MissingAddress)?;

    let status = StationStatus::parse(record.status.as_deref());
    if status != StationStatus::Open {
        return Err(DropReason::NotOpen);
    }

    let position = extract_coordinates(position).ok_or(DropReason::MalformedPosition)?;

    Ok(CleanStation {
        name: record.name.as_deref().and_then(normalize_name),
        address: address.to_string(),
        available_bikes: record.available_bikes,
        available_bike_stands: record.available_bike_stands,
        status,
        position,
        last_updated: observed_at,
    })
}

/// Cleans a batch of station records.
///
/// Rows missing a position or address, rows that are not open, and rows whose
/// position cannot be read are dropped one by one; survivors keep their
/// relative order and are stamped with `observed_at`.
pub fn normalize_stations(records: &[StationRecord], observed_at: DateTime<Utc>) -> Normalized {
    let mut report = StageReport::new("normalize");
    report.input_rows = records.len();

    if records.is_empty() {
        warn!("No station data to clean");
        return Normalized {
            stations: Vec::new(),
            report,
        };
    }

    info!(input_rows = records.len(), "Cleaning station data");

    let mut stations = Vec::with_capacity(records.len());
    for record in records {
        match clean_record(record, observed_at) {
            Ok(station) => stations.push(station),
            Err(reason) => report.record_drop(reason),
        }
    }

    report.output_rows = stations.len();
    Normalized { stations, report }
}

/// Normalizes a parsed feed, accounting for elements the parser already skipped.
pub fn normalize_feed(feed: &ParsedFeed, observed_at: DateTime<Utc>) -> Normalized {
    let mut normalized = normalize_stations(&feed.records, observed_at);
    normalized.report.input_rows += feed.undecodable;
    normalized
        .report
        .record_drops(DropReason::Undecodable, feed.undecodable);
    normalized
}
