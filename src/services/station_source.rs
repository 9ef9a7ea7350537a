//! Trait for providers of raw station feed payloads.

use anyhow::Result;

/// Abstraction over where the live station payload comes from (HTTP API,
/// local snapshot, test double).
#[async_trait::async_trait]
pub trait StationSource: Send + Sync {
    /// Returns the raw JSON payload. An error here means the data is
    /// unavailable, which the pipeline treats as non-fatal.
    async fn fetch_raw(&self) -> Result<Vec<u8>>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}
