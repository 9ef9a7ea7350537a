//! Records flowing through the pipeline, from raw feed rows to enriched stations.

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One station as delivered by the live feed.
///
/// Every field is optional so that a single incomplete row never fails the
/// whole batch. `position` is kept as raw JSON because its sub-keys are
/// validated during normalization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StationRecord {
    pub number: Option<u64>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub position: Option<serde_json::Value>,
    pub status: Option<String>,
    pub available_bikes: Option<u32>,
    pub available_bike_stands: Option<u32>,
}

/// Operational status of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StationStatus {
    Open,
    Closed,
    Unknown,
}

impl StationStatus {
    /// Maps the feed's status string. Anything but `OPEN`/`CLOSED` is unknown.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("OPEN") => StationStatus::Open,
            Some("CLOSED") => StationStatus::Closed,
            _ => StationStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StationStatus::Open => "OPEN",
            StationStatus::Closed => "CLOSED",
            StationStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the WGS84 degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// `geo` points are (x = longitude, y = latitude).
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A station that survived normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanStation {
    pub name: Option<String>,
    pub address: String,
    pub available_bikes: Option<u32>,
    pub available_bike_stands: Option<u32>,
    pub status: StationStatus,
    pub position: Coordinates,
    /// When the pipeline processed the record, not when the feed observed it.
    pub last_updated: DateTime<Utc>,
}

/// Transit mode of a reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitMode {
    Metro,
    Bus,
}

impl TransitMode {
    pub const ALL: [TransitMode; 2] = [TransitMode::Metro, TransitMode::Bus];

    /// GTFS `route_type` discriminator: 1 is metro, 3 is bus, everything else is ignored.
    pub fn from_route_type(route_type: i32) -> Option<Self> {
        match route_type {
            1 => Some(TransitMode::Metro),
            3 => Some(TransitMode::Bus),
            _ => None,
        }
    }

    /// Name of the enrichment column for this mode at the given radius,
    /// e.g. `metro_stations_nearby_500m`.
    pub fn column_name(&self, radius_m: f64) -> String {
        match self {
            TransitMode::Metro => format!("metro_stations_nearby_{radius_m}m"),
            TransitMode::Bus => format!("bus_stops_nearby_{radius_m}m"),
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitMode::Metro => f.write_str("metro"),
            TransitMode::Bus => f.write_str("bus"),
        }
    }
}

/// A uniquely named transit stop used as an enrichment anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub mode: TransitMode,
    pub name: String,
    pub position: Coordinates,
}

/// Result of counting reference points around one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NearbyCount {
    Within(u32),
    /// A coordinate on either side was unusable. Never collapsed into zero.
    Invalid,
}

impl NearbyCount {
    /// Value written to the output table; `-1` marks an invalid count.
    pub fn as_i64(&self) -> i64 {
        match self {
            NearbyCount::Within(n) => i64::from(*n),
            NearbyCount::Invalid => -1,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, NearbyCount::Invalid)
    }
}

/// A cleaned station with one nearby count per transit mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedStation {
    pub station: CleanStation,
    pub nearby_metro_count: NearbyCount,
    pub nearby_bus_count: NearbyCount,
}

/// The enriched output table. The radii are carried along because they name
/// the count columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTable {
    pub metro_radius_m: f64,
    pub bus_radius_m: f64,
    pub rows: Vec<EnrichedStation>,
}

impl EnrichedTable {
    pub const BASE_COLUMNS: [&'static str; 8] = [
        "name",
        "address",
        "available_bikes",
        "available_bike_stands",
        "status",
        "position_lat",
        "position_lon",
        "last_updated",
    ];

    pub fn headers(&self) -> Vec<String> {
        Self::BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain([
                TransitMode::Metro.column_name(self.metro_radius_m),
                TransitMode::Bus.column_name(self.bus_radius_m),
            ])
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
