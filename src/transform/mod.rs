//! Station cleaning: record filtering, coordinate extraction and name cleanup.

pub mod names;
pub mod normalize;

pub use names::normalize_name;
pub use normalize::{Normalized, extract_coordinates, normalize_feed, normalize_stations};
