//! Static GTFS reference data: table loading and reference-point extraction.

pub mod extract;
pub mod tables;

pub use extract::{Extraction, ReferenceSets, extract_reference_points, load_reference_points};
pub use tables::{GtfsTables, load_tables};
