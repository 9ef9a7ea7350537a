//! Loader for the four static GTFS files the reference extraction needs.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stop_lon: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub route_type: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trip {
    pub route_id: String,
    pub trip_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
}

/// The relational subset of a GTFS feed: stops ↔ stop_times ↔ trips ↔ routes.
#[derive(Debug, Clone, Default)]
pub struct GtfsTables {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTime>,
    /// Rows skipped because they could not be decoded.
    pub skipped_rows: usize,
}

/// Reads every decodable row of one GTFS file.
///
/// Returns the rows and the number of rows that failed to decode.
fn read_table<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    let file = File::open(path).with_context(|| format!("missing GTFS file {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    let mut skipped = 0;
    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping GTFS row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, kept = rows.len(), "Skipped undecodable GTFS rows");
    }
    Ok((rows, skipped))
}

/// Loads `stops.txt`, `routes.txt`, `trips.txt` and `stop_times.txt` from `dir`.
///
/// # Errors
///
/// Fails if any of the four files is missing or unreadable.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_tables(dir: &Path) -> Result<GtfsTables> {
    let (stops, s1) = read_table::<Stop>(&dir.join("stops.txt"))?;
    let (routes, s2) = read_table::<Route>(&dir.join("routes.txt"))?;
    let (trips, s3) = read_table::<Trip>(&dir.join("trips.txt"))?;
    let (stop_times, s4) = read_table::<StopTime>(&dir.join("stop_times.txt"))?;

    debug!(
        stops = stops.len(),
        routes = routes.len(),
        trips = trips.len(),
        stop_times = stop_times.len(),
        "GTFS tables loaded"
    );

    Ok(GtfsTables {
        stops,
        routes,
        trips,
        stop_times,
        skipped_rows: s1 + s2 + s3 + s4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn write_all(dir: &Path) {
        write(
            dir,
            "stops.txt",
            "stop_id,stop_code,stop_name,stop_lat,stop_lon,location_type\n\
             S1,1,Capitole,43.6045,1.4440,0\n\
             S2,2,Jean Jaures,not-a-number,1.4490,0\n",
        );
        write(
            dir,
            "routes.txt",
            "route_id,agency_id,route_short_name,route_type\nA,1,A,1\nL1,1,L1,3\nBAD,1,X,tram\n",
        );
        write(dir, "trips.txt", "route_id,service_id,trip_id\nA,wk,T1\n");
        write(dir, "stop_times.txt", "trip_id,arrival_time,stop_id,stop_sequence\nT1,08:00:00,S1,1\n");
    }

    #[test]
    fn test_load_tables_ignores_extra_columns() {
        let dir = TempDir::new().unwrap();
        write_all(dir.path());

        let tables = load_tables(dir.path()).unwrap();

        assert_eq!(tables.stops.len(), 2);
        assert_eq!(tables.routes.len(), 2);
        assert_eq!(tables.trips.len(), 1);
        assert_eq!(tables.stop_times.len(), 1);
        assert_eq!(tables.skipped_rows, 1);
    }

    #[test]
    fn test_unparseable_coordinate_becomes_missing() {
        let dir = TempDir::new().unwrap();
        write_all(dir.path());

        let tables = load_tables(dir.path()).unwrap();
        let jaures = tables.stops.iter().find(|s| s.stop_id == "S2").unwrap();

        assert_eq!(jaures.stop_lat, None);
        assert_eq!(jaures.stop_lon, Some(1.449));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_all(dir.path());
        fs::remove_file(dir.path().join("trips.txt")).unwrap();

        assert!(load_tables(dir.path()).is_err());
    }
}
