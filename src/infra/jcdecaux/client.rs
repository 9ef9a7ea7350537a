use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::services::StationSource;

/// Fetches live station occupancy for one contract.
pub struct JcDecauxClient {
    endpoint: String,
    contract: String,
    http: Box<dyn HttpClient>,
}

impl JcDecauxClient {
    pub fn new(
        endpoint: &str,
        contract: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = UrlParam::new(BasicClient::with_timeout(timeout)?, "contract", contract);
        let http: Box<dyn HttpClient> = match api_key {
            Some(key) => Box::new(UrlParam::new(base, "apiKey", key)),
            None => Box::new(base),
        };

        Ok(Self {
            endpoint: endpoint.to_string(),
            contract: contract.to_string(),
            http,
        })
    }
}

#[async_trait]
impl StationSource for JcDecauxClient {
    #[tracing::instrument(skip(self), fields(contract = %self.contract))]
    async fn fetch_raw(&self) -> Result<Vec<u8>> {
        info!(endpoint = %self.endpoint, "Fetching live station data");
        let started = std::time::Instant::now();
        let bytes = fetch_bytes(self.http.as_ref(), &self.endpoint).await?;
        debug!(
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Station payload received"
        );
        Ok(bytes)
    }

    fn describe(&self) -> String {
        format!("{} (contract={})", self.endpoint, self.contract)
    }
}
