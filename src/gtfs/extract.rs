//! Reference-point extraction: joins the schedule tables and collapses
//! physical stops into one named point per transit mode.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::model::{Coordinates, ReferencePoint, TransitMode};
use crate::report::{Degradation, DropReason, StageReport};

use super::tables::{GtfsTables, Stop, load_tables};

/// One reference set per transit mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSets {
    pub metro: Vec<ReferencePoint>,
    pub bus: Vec<ReferencePoint>,
}

impl ReferenceSets {
    pub fn get(&self, mode: TransitMode) -> &[ReferencePoint] {
        match mode {
            TransitMode::Metro => &self.metro,
            TransitMode::Bus => &self.bus,
        }
    }
}

/// Output of the extraction stage.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub sets: ReferenceSets,
    pub report: StageReport,
    pub degradations: Vec<Degradation>,
}

/// Builds the metro and bus reference sets from in-memory GTFS tables.
///
/// Rows are visited in join order: routes in file order, each route's trips in
/// file order, then each trip's stops in `stop_times` order. The first stop
/// met for a given `(name, mode)` supplies the coordinates of the group; later
/// stops with the same name are not averaged in. Each output set is sorted by
/// name.
pub fn extract_reference_points(tables: &GtfsTables) -> Extraction {
    let mut report = StageReport::new("extract_reference_points");
    report.input_rows = tables.skipped_rows;
    report.record_drops(DropReason::Undecodable, tables.skipped_rows);

    let stops_by_id: HashMap<&str, &Stop> = tables.stops.iter().fold(HashMap::new(), |mut m, s| {
        m.entry(s.stop_id.as_str()).or_insert(s);
        m
    });

    let mut trips_by_route: HashMap<&str, Vec<&str>> = HashMap::new();
    for trip in &tables.trips {
        trips_by_route
            .entry(trip.route_id.as_str())
            .or_default()
            .push(trip.trip_id.as_str());
    }

    let mut stops_by_trip: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();
    for st in &tables.stop_times {
        if seen_pairs.insert((st.trip_id.as_str(), st.stop_id.as_str())) {
            stops_by_trip
                .entry(st.trip_id.as_str())
                .or_default()
                .push(st.stop_id.as_str());
        }
    }

    let mut seen_routes: HashSet<&str> = HashSet::new();
    let mut seen_stops: HashSet<(&str, i32)> = HashSet::new();
    let mut grouped: BTreeMap<(TransitMode, &str), Coordinates> = BTreeMap::new();

    for route in &tables.routes {
        if !seen_routes.insert(route.route_id.as_str()) {
            continue;
        }
        let Some(trips) = trips_by_route.get(route.route_id.as_str()) else {
            continue;
        };

        for &trip_id in trips {
            let Some(stop_ids) = stops_by_trip.get(trip_id) else {
                continue;
            };

            for &stop_id in stop_ids {
                if !seen_stops.insert((stop_id, route.route_type)) {
                    continue;
                }
                report.input_rows += 1;

                let Some(stop) = stops_by_id.get(stop_id) else {
                    report.record_drop(DropReason::UnknownStop);
                    continue;
                };
                let Some(mode) = TransitMode::from_route_type(route.route_type) else {
                    report.record_drop(DropReason::OtherTransitMode);
                    continue;
                };
                let name = stop.stop_name.trim();
                if name.is_empty() {
                    report.record_drop(DropReason::BlankStopName);
                    continue;
                }
                let coords = match (stop.stop_lat, stop.stop_lon) {
                    (Some(lat), Some(lon)) if Coordinates::new(lat, lon).is_valid() => {
                        Coordinates::new(lat, lon)
                    }
                    _ => {
                        report.record_drop(DropReason::MissingStopCoordinates);
                        continue;
                    }
                };

                match grouped.entry((mode, name)) {
                    Entry::Vacant(slot) => {
                        slot.insert(coords);
                    }
                    Entry::Occupied(_) => report.record_drop(DropReason::MergedSameName),
                }
            }
        }
    }

    let mut sets = ReferenceSets::default();
    for ((mode, name), position) in grouped {
        let point = ReferencePoint {
            mode,
            name: name.to_string(),
            position,
        };
        match mode {
            TransitMode::Metro => sets.metro.push(point),
            TransitMode::Bus => sets.bus.push(point),
        }
    }
    report.output_rows = sets.metro.len() + sets.bus.len();

    info!(
        metro = sets.metro.len(),
        bus = sets.bus.len(),
        "Unique named reference points extracted"
    );

    let degradations = TransitMode::ALL
        .into_iter()
        .filter(|mode| sets.get(*mode).is_empty())
        .map(|mode| Degradation::EmptyReferenceSet { mode })
        .collect();

    Extraction {
        sets,
        report,
        degradations,
    }
}

/// Loads the GTFS tables from `dir` and extracts the reference sets.
///
/// A missing or unreadable table is not fatal: both sets come back empty and
/// a [`Degradation::ReferenceDataUnavailable`] explains why.
pub fn load_reference_points(dir: &Path) -> Extraction {
    match load_tables(dir) {
        Ok(tables) => extract_reference_points(&tables),
        Err(e) => {
            warn!(dir = %dir.display(), error = %format!("{e:#}"), "GTFS reference data unavailable");
            Extraction {
                sets: ReferenceSets::default(),
                report: StageReport::new("extract_reference_points"),
                degradations: vec![Degradation::ReferenceDataUnavailable {
                    reason: format!("{e:#}"),
                }],
            }
        }
    }
}
