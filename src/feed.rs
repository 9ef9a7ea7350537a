//! JSON parser for the live station feed.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::model::StationRecord;

/// Station records decoded from one feed payload.
#[derive(Debug, Default, Clone)]
pub struct ParsedFeed {
    pub records: Vec<StationRecord>,
    /// Array elements that could not be read as a station record.
    pub undecodable: usize,
}

impl ParsedFeed {
    pub fn len(&self) -> usize {
        self.records.len() + self.undecodable
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes a feed payload into [`StationRecord`]s.
///
/// Elements that fail to decode are counted and skipped.
///
/// # Errors
///
/// Returns [`PipelineError::Structural`] if the payload is not JSON, is not an
/// array, or if none of a non-empty batch carries a `position` field.
pub fn parse_station_feed(bytes: &[u8]) -> Result<ParsedFeed, PipelineError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PipelineError::Structural(format!("payload is not JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(PipelineError::Structural(
            "payload is not an array of station records".to_string(),
        ));
    };

    if !items.is_empty() && !items.iter().any(|item| item.get("position").is_some()) {
        return Err(PipelineError::Structural(
            "no station record carries a position field".to_string(),
        ));
    }

    let mut feed = ParsedFeed::default();
    for item in items {
        match serde_json::from_value::<StationRecord>(item) {
            Ok(record) => feed.records.push(record),
            Err(e) => {
                debug!(error = %e, "Skipping undecodable station record");
                feed.undecodable += 1;
            }
        }
    }

    if feed.undecodable > 0 {
        warn!(
            undecodable = feed.undecodable,
            decoded = feed.records.len(),
            "Some station records could not be decoded"
        );
    }

    Ok(feed)
}
