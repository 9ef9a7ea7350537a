//! Radius counting between stations and reference points.
//!
//! Uses the haversine great-circle formula on a sphere of mean Earth radius
//! (6 371 008.8 m, `geo`'s constant) over degree coordinates. No ellipsoidal
//! correction is applied.
//!
//! Counting is a brute-force scan, O(stations × references) per radius. That
//! is fine for reference sets in the low thousands; stations are spread over
//! the rayon pool since each count is independent.

use geo::HaversineDistance;
use rayon::prelude::*;

use crate::model::{CleanStation, Coordinates, NearbyCount, ReferencePoint};

/// Great-circle distance in meters between two points given in degrees.
pub fn great_circle_distance(a: Coordinates, b: Coordinates) -> f64 {
    a.to_point().haversine_distance(&b.to_point())
}

/// Counts reference points within `radius_m` meters of `origin`, boundary included.
///
/// Returns [`NearbyCount::Invalid`] if the origin, any reference coordinate,
/// or the radius itself is unusable.
pub fn count_within(origin: Coordinates, refs: &[ReferencePoint], radius_m: f64) -> NearbyCount {
    if !origin.is_valid() || !radius_m.is_finite() || radius_m < 0.0 {
        return NearbyCount::Invalid;
    }

    let mut count: u32 = 0;
    for point in refs {
        if !point.position.is_valid() {
            return NearbyCount::Invalid;
        }
        if great_circle_distance(origin, point.position) <= radius_m {
            count += 1;
        }
    }
    NearbyCount::Within(count)
}

/// Counts for every station, in station order.
pub fn count_for_stations(
    stations: &[CleanStation],
    refs: &[ReferencePoint],
    radius_m: f64,
) -> Vec<NearbyCount> {
    stations
        .par_iter()
        .map(|s| count_within(s.position, refs, radius_m))
        .collect()
}
