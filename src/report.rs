//! Per-stage audit records and degraded-mode signals.
//!
//! Every stage reports how many rows came in, how many went out, and why the
//! rest were dropped, so data loss stays auditable.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::model::{CleanStation, TransitMode};

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Undecodable,
    MissingPosition,
    MissingAddress,
    MalformedPosition,
    NotOpen,
    UnknownStop,
    MissingStopCoordinates,
    BlankStopName,
    OtherTransitMode,
    /// Collapsed into an earlier stop with the same name and mode.
    MergedSameName,
}

/// A non-fatal condition that put the run into degraded mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    StationFeedUnavailable { reason: String },
    EmptyStationBatch,
    ReferenceDataUnavailable { reason: String },
    EmptyReferenceSet { mode: TransitMode },
}

/// Row accounting for one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub input_rows: usize,
    pub output_rows: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl StageReport {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Default::default()
        }
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        self.record_drops(reason, 1);
    }

    pub fn record_drops(&mut self, reason: DropReason, count: usize) {
        if count > 0 {
            *self.dropped.entry(reason).or_default() += count;
        }
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    /// Emits the report as one structured log line.
    pub fn log(&self) {
        let dropped = serde_json::to_string(&self.dropped).unwrap_or_default();
        info!(
            stage = %self.stage,
            input_rows = self.input_rows,
            output_rows = self.output_rows,
            dropped_total = self.dropped_total(),
            dropped = %dropped,
            "Stage finished"
        );
    }
}

/// Missing values per optional column of the cleaned table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_records: usize,
    pub missing_values: BTreeMap<&'static str, usize>,
}

impl QualityReport {
    pub fn from_stations(stations: &[CleanStation]) -> Self {
        let mut missing_values = BTreeMap::new();
        let mut bump = |column: &'static str, missing: bool| {
            if missing {
                *missing_values.entry(column).or_insert(0) += 1;
            }
        };

        for s in stations {
            bump("name", s.name.is_none());
            bump("available_bikes", s.available_bikes.is_none());
            bump("available_bike_stands", s.available_bike_stands.is_none());
        }

        Self {
            total_records: stations.len(),
            missing_values,
        }
    }

    pub fn log(&self) {
        if self.total_records == 0 {
            warn!("No station data to validate");
            return;
        }
        if self.missing_values.is_empty() {
            info!(total_records = self.total_records, "No missing values");
        } else {
            for (column, count) in &self.missing_values {
                warn!(total_records = self.total_records, column, count, "Missing values");
            }
        }
    }
}

/// Everything a single pipeline run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
    pub quality: Option<QualityReport>,
    pub degradations: Vec<Degradation>,
    pub rows_loaded: usize,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            quality: None,
            degradations: Vec::new(),
            rows_loaded: 0,
        }
    }

    pub fn push_stage(&mut self, report: StageReport) {
        report.log();
        self.stages.push(report);
    }

    pub fn degrade(&mut self, degradation: Degradation) {
        warn!(?degradation, "Running in degraded mode");
        self.degradations.push(degradation);
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Logs the whole report as pretty-printed JSON.
    pub fn print_json(&self) -> anyhow::Result<()> {
        info!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, StationStatus};

    #[test]
    fn test_record_drops_accumulates() {
        let mut report = StageReport::new("normalize");
        report.record_drop(DropReason::NotOpen);
        report.record_drop(DropReason::NotOpen);
        report.record_drops(DropReason::MissingAddress, 3);
        report.record_drops(DropReason::MissingPosition, 0);

        assert_eq!(report.dropped.get(&DropReason::NotOpen), Some(&2));
        assert_eq!(report.dropped.get(&DropReason::MissingAddress), Some(&3));
        assert!(!report.dropped.contains_key(&DropReason::MissingPosition));
        assert_eq!(report.dropped_total(), 5);
    }

    #[test]
    fn test_quality_report_counts_missing_columns() {
        let station = CleanStation {
            name: None,
            address: "1 Rd".to_string(),
            available_bikes: Some(3),
            available_bike_stands: None,
            status: StationStatus::Open,
            position: Coordinates::new(43.6, 1.44),
            last_updated: Utc::now(),
        };
        let quality = QualityReport::from_stations(&[station.clone(), station]);

        assert_eq!(quality.total_records, 2);
        assert_eq!(quality.missing_values.get("name"), Some(&2));
        assert_eq!(quality.missing_values.get("available_bike_stands"), Some(&2));
        assert_eq!(quality.missing_values.get("available_bikes"), None);
    }

    #[test]
    fn test_run_report_serializes_degradations() {
        let mut report = RunReport::start();
        report.degrade(Degradation::EmptyReferenceSet {
            mode: TransitMode::Bus,
        });
        let json = serde_json::to_string(&report.finish()).unwrap();

        assert!(json.contains("\"kind\":\"empty_reference_set\""));
        assert!(json.contains("\"mode\":\"bus\""));
    }
}
