//! Run configuration, passed explicitly to every stage that needs it.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::enrich::EnrichmentConfig;
use crate::error::PipelineError;

pub const DEFAULT_FEED_ENDPOINT: &str = "https://api.jcdecaux.com/vls/v1/stations";

#[derive(Clone)]
pub struct PipelineConfig {
    /// Live station feed URL, or a local JSON file path.
    pub feed_endpoint: String,
    /// Bike-share contract (region) requested from the feed.
    pub contract: String,
    pub api_key: Option<String>,
    pub feed_timeout_seconds: u64,
    pub run_timeout_seconds: u64,
    /// Directory holding the static GTFS files.
    pub reference_data_path: PathBuf,
    pub metro_radius_m: f64,
    pub bus_radius_m: f64,
    /// Destination table, a CSV file replaced on every run.
    pub sink_connection: PathBuf,
    /// Where to keep a copy of the raw feed payload, if anywhere.
    pub raw_snapshot_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let radii = EnrichmentConfig::default();
        Self {
            feed_endpoint: DEFAULT_FEED_ENDPOINT.to_string(),
            contract: "toulouse".to_string(),
            api_key: None,
            feed_timeout_seconds: 30,
            run_timeout_seconds: 300,
            reference_data_path: PathBuf::from("data/tisseo_gtfs"),
            metro_radius_m: radii.metro_radius_m,
            bus_radius_m: radii.bus_radius_m,
            sink_connection: PathBuf::from("data/stations_enriched.csv"),
            raw_snapshot_path: None,
        }
    }
}

// Hand-written so the API key never reaches the logs.
impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("feed_endpoint", &self.feed_endpoint)
            .field("contract", &self.contract)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("feed_timeout_seconds", &self.feed_timeout_seconds)
            .field("run_timeout_seconds", &self.run_timeout_seconds)
            .field("reference_data_path", &self.reference_data_path)
            .field("metro_radius_m", &self.metro_radius_m)
            .field("bus_radius_m", &self.bus_radius_m)
            .field("sink_connection", &self.sink_connection)
            .field("raw_snapshot_path", &self.raw_snapshot_path)
            .finish()
    }
}

impl PipelineConfig {
    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.feed_endpoint.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("feed endpoint is empty".into()));
        }
        if self.is_remote_feed() && self.contract.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("contract is empty".into()));
        }
        for (label, radius) in [("metro", self.metro_radius_m), ("bus", self.bus_radius_m)] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{label} radius must be a positive number of meters, got {radius}"
                )));
            }
        }
        if self.feed_timeout_seconds == 0 || self.run_timeout_seconds == 0 {
            return Err(PipelineError::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    pub fn is_remote_feed(&self) -> bool {
        self.feed_endpoint.starts_with("http")
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_seconds)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }

    pub fn enrichment(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            metro_radius_m: self.metro_radius_m,
            bus_radius_m: self.bus_radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metro_radius_m, 500.0);
        assert_eq!(config.bus_radius_m, 200.0);
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let config = PipelineConfig {
            bus_radius_m: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        let config = PipelineConfig {
            metro_radius_m: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = PipelineConfig {
            feed_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_feed_needs_no_contract() {
        let config = PipelineConfig {
            feed_endpoint: "tests/fixtures/stations.json".to_string(),
            contract: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = PipelineConfig {
            api_key: Some("secret-key".to_string()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
