pub mod file_source;
pub mod jcdecaux;

pub use file_source::FileSource;
pub use jcdecaux::JcDecauxClient;

use crate::config::PipelineConfig;
use crate::services::StationSource;

/// Picks a station source from the configured endpoint: HTTP(S) URLs go to
/// the live API, anything else is read as a local file.
pub fn source_for(config: &PipelineConfig) -> anyhow::Result<Box<dyn StationSource>> {
    if config.is_remote_feed() {
        Ok(Box::new(JcDecauxClient::new(
            &config.feed_endpoint,
            &config.contract,
            config.api_key.as_deref(),
            config.feed_timeout(),
        )?))
    } else {
        Ok(Box::new(FileSource::new(&config.feed_endpoint)))
    }
}
