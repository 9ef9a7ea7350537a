//! Joins cleaned stations with the transit reference sets.

use tracing::{info, warn};

use crate::gtfs::ReferenceSets;
use crate::model::{CleanStation, EnrichedStation, EnrichedTable, NearbyCount, TransitMode};
use crate::proximity::count_for_stations;
use crate::report::{Degradation, StageReport};

/// Search radius per transit mode, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentConfig {
    pub metro_radius_m: f64,
    pub bus_radius_m: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            metro_radius_m: 500.0,
            bus_radius_m: 200.0,
        }
    }
}

impl EnrichmentConfig {
    pub fn radius_for(&self, mode: TransitMode) -> f64 {
        match mode {
            TransitMode::Metro => self.metro_radius_m,
            TransitMode::Bus => self.bus_radius_m,
        }
    }
}

/// Output of the enrichment stage.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub table: EnrichedTable,
    pub report: StageReport,
    pub degradations: Vec<Degradation>,
}

/// Counts for one mode, or zeros plus a degradation when the set is empty.
fn mode_counts(
    mode: TransitMode,
    stations: &[CleanStation],
    sets: &ReferenceSets,
    config: &EnrichmentConfig,
    degradations: &mut Vec<Degradation>,
) -> Vec<NearbyCount> {
    let refs = sets.get(mode);
    if refs.is_empty() {
        warn!(%mode, "Reference set empty, filling nearby counts with zero");
        degradations.push(Degradation::EmptyReferenceSet { mode });
        return vec![NearbyCount::Within(0); stations.len()];
    }

    let radius_m = config.radius_for(mode);
    let counts = count_for_stations(stations, refs, radius_m);

    let invalid = counts.iter().filter(|c| c.is_invalid()).count();
    if invalid > 0 {
        warn!(%mode, invalid, "Some nearby counts could not be computed");
    }
    info!(%mode, radius_m, references = refs.len(), "Nearby counts computed");
    counts
}

/// Appends a nearby-count column per transit mode to each station.
///
/// Metro and bus counts are computed independently, so their order does not
/// matter. An empty reference set does not fail the stage: its column is
/// zero-filled and a [`Degradation::EmptyReferenceSet`] is returned.
pub fn enrich_stations(
    stations: &[CleanStation],
    sets: &ReferenceSets,
    config: &EnrichmentConfig,
) -> Enrichment {
    let mut report = StageReport::new("enrich");
    report.input_rows = stations.len();
    let mut degradations = Vec::new();

    let metro = mode_counts(TransitMode::Metro, stations, sets, config, &mut degradations);
    let bus = mode_counts(TransitMode::Bus, stations, sets, config, &mut degradations);

    let rows: Vec<EnrichedStation> = stations
        .iter()
        .cloned()
        .zip(metro.into_iter().zip(bus))
        .map(|(station, (nearby_metro_count, nearby_bus_count))| EnrichedStation {
            station,
            nearby_metro_count,
            nearby_bus_count,
        })
        .collect();
    report.output_rows = rows.len();

    Enrichment {
        table: EnrichedTable {
            metro_radius_m: config.metro_radius_m,
            bus_radius_m: config.bus_radius_m,
            rows,
        },
        report,
        degradations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, ReferencePoint, StationStatus};
    use chrono::Utc;

    fn station(name: &str, lat: f64, lon: f64) -> CleanStation {
        CleanStation {
            name: Some(name.to_string()),
            address: format!("{name} street"),
            available_bikes: Some(4),
            available_bike_stands: Some(6),
            status: StationStatus::Open,
            position: Coordinates::new(lat, lon),
            last_updated: Utc::now(),
        }
    }

    fn reference(mode: TransitMode, name: &str, lat: f64, lon: f64) -> ReferencePoint {
        ReferencePoint {
            mode,
            name: name.to_string(),
            position: Coordinates::new(lat, lon),
        }
    }

    fn stations() -> Vec<CleanStation> {
        vec![
            station("Capitole", 43.6045, 1.4440),
            station("Far Away", 43.5000, 1.3000),
        ]
    }

    fn metro_set() -> Vec<ReferencePoint> {
        vec![
            reference(TransitMode::Metro, "Capitole", 43.6044, 1.4452),
            reference(TransitMode::Metro, "Esquirol", 43.6003, 1.4442),
        ]
    }

    #[test]
    fn test_empty_bus_set_zero_fills_and_degrades() {
        let sets = ReferenceSets {
            metro: metro_set(),
            bus: Vec::new(),
        };
        let out = enrich_stations(&stations(), &sets, &EnrichmentConfig::default());

        assert_eq!(out.table.len(), 2);
        assert!(
            out.table
                .rows
                .iter()
                .all(|r| r.nearby_bus_count == NearbyCount::Within(0))
        );
        assert_eq!(out.table.rows[0].nearby_metro_count, NearbyCount::Within(2));
        assert_eq!(out.table.rows[1].nearby_metro_count, NearbyCount::Within(0));
        assert_eq!(
            out.degradations,
            vec![Degradation::EmptyReferenceSet {
                mode: TransitMode::Bus
            }]
        );
    }

    #[test]
    fn test_radii_are_independent() {
        let sets = ReferenceSets {
            metro: metro_set(),
            bus: vec![reference(TransitMode::Bus, "Esquirol", 43.6003, 1.4442)],
        };
        let config = EnrichmentConfig {
            metro_radius_m: 500.0,
            bus_radius_m: 200.0,
        };
        let out = enrich_stations(&stations(), &sets, &config);

        // Esquirol is ~470m from Capitole: inside the metro radius, outside the bus one.
        assert_eq!(out.table.rows[0].nearby_metro_count, NearbyCount::Within(2));
        assert_eq!(out.table.rows[0].nearby_bus_count, NearbyCount::Within(0));
        assert!(out.degradations.is_empty());
    }

    #[test]
    fn test_mode_order_does_not_matter() {
        let bus = vec![reference(TransitMode::Bus, "Capitole", 43.6046, 1.4441)];
        let forward = ReferenceSets {
            metro: metro_set(),
            bus: bus.clone(),
        };
        let out = enrich_stations(&stations(), &forward, &EnrichmentConfig::default());

        let metro_only = enrich_stations(
            &stations(),
            &ReferenceSets {
                metro: metro_set(),
                bus: Vec::new(),
            },
            &EnrichmentConfig::default(),
        );
        let bus_only = enrich_stations(
            &stations(),
            &ReferenceSets {
                metro: Vec::new(),
                bus,
            },
            &EnrichmentConfig::default(),
        );

        for (i, row) in out.table.rows.iter().enumerate() {
            assert_eq!(row.nearby_metro_count, metro_only.table.rows[i].nearby_metro_count);
            assert_eq!(row.nearby_bus_count, bus_only.table.rows[i].nearby_bus_count);
        }
    }

    #[test]
    fn test_invalid_reference_surfaces_sentinel() {
        let sets = ReferenceSets {
            metro: vec![reference(TransitMode::Metro, "Broken", f64::NAN, 1.44)],
            bus: Vec::new(),
        };
        let out = enrich_stations(&stations(), &sets, &EnrichmentConfig::default());

        assert!(out.table.rows.iter().all(|r| r.nearby_metro_count == NearbyCount::Invalid));
        assert_eq!(out.table.rows[0].nearby_metro_count.as_i64(), -1);
    }

    #[test]
    fn test_column_headers_use_radii() {
        let out = enrich_stations(&[], &ReferenceSets::default(), &EnrichmentConfig::default());
        let headers = out.table.headers();

        assert_eq!(headers.len(), 10);
        assert_eq!(headers[8], "metro_stations_nearby_500m");
        assert_eq!(headers[9], "bus_stops_nearby_200m");
    }
}
