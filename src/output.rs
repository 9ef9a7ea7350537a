//! Persistence of the enriched station table.
//!
//! The destination is replaced wholesale on every run; no history is kept.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::model::{CleanStation, EnrichedStation, EnrichedTable};

/// A few columns of one stored station, for verification output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSample {
    pub name: String,
    pub address: String,
    pub available_bikes: Option<u32>,
}

/// What the destination currently holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkSummary {
    pub row_count: usize,
    pub sample: Vec<StationSample>,
    pub top_by_available_bikes: Vec<StationSample>,
}

/// A table store that accepts replace-on-write loads.
pub trait StationSink: Send + Sync {
    /// Replaces the destination's contents with `table`. Returns rows written.
    fn replace_all(&self, table: &EnrichedTable) -> Result<usize>;

    /// Reads back a row count and up to `sample` example rows.
    fn summary(&self, sample: usize) -> Result<SinkSummary>;
}

/// Stores the table as one CSV file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the destination, so readers never see a half-written table.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_file(&self) -> Result<NamedTempFile> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(NamedTempFile::new_in(&dir)?)
    }
}

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn station_fields(s: &CleanStation) -> Vec<String> {
    vec![
        s.name.clone().unwrap_or_default(),
        s.address.clone(),
        opt_to_string(s.available_bikes),
        opt_to_string(s.available_bike_stands),
        s.status.to_string(),
        s.position.lat.to_string(),
        s.position.lon.to_string(),
        s.last_updated.to_rfc3339(),
    ]
}

fn enriched_fields(row: &EnrichedStation) -> Vec<String> {
    let mut fields = station_fields(&row.station);
    fields.push(row.nearby_metro_count.as_i64().to_string());
    fields.push(row.nearby_bus_count.as_i64().to_string());
    fields
}

/// Writes cleaned (not yet enriched) stations as CSV.
pub fn write_clean_stations<W: Write>(writer: W, stations: &[CleanStation]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(EnrichedTable::BASE_COLUMNS)?;
    for station in stations {
        writer.write_record(station_fields(station))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_table<W: Write>(writer: W, table: &EnrichedTable) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(table.headers())?;
    for row in &table.rows {
        writer.write_record(enriched_fields(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn sample_from(record: &StringRecord, name: usize, address: usize, bikes: usize) -> StationSample {
    StationSample {
        name: record.get(name).unwrap_or_default().to_string(),
        address: record.get(address).unwrap_or_default().to_string(),
        available_bikes: record.get(bikes).and_then(|b| b.parse().ok()),
    }
}

impl StationSink for CsvSink {
    fn replace_all(&self, table: &EnrichedTable) -> Result<usize> {
        let mut staging = self.staging_file()?;
        write_table(staging.as_file_mut(), table)?;
        staging.as_file().sync_all()?;
        staging
            .persist(&self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        info!(path = %self.path.display(), rows = table.len(), "Station table replaced");
        Ok(table.len())
    }

    fn summary(&self, sample: usize) -> Result<SinkSummary> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut rdr = ReaderBuilder::new().from_reader(file);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| format!("column {name} missing from stored table"))
        };
        let (name, address, bikes) = (column("name")?, column("address")?, column("available_bikes")?);

        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(sample_from(&record?, name, address, bikes));
        }
        debug!(path = %self.path.display(), rows = rows.len(), "Stored table read back");

        let mut top = rows.clone();
        top.sort_by(|a, b| b.available_bikes.cmp(&a.available_bikes));
        top.truncate(5);

        Ok(SinkSummary {
            row_count: rows.len(),
            sample: rows.into_iter().take(sample).collect(),
            top_by_available_bikes: top,
        })
    }
}
