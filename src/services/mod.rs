pub mod station_source;

pub use station_source::StationSource;
