use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends a query parameter to every request.
///
/// The station feed takes both its region (`contract`) and its credential
/// (`apiKey`) this way, so wrappers are stacked one per parameter.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub value: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: &str, value: &str) -> Self {
        Self {
            inner,
            param_name: param_name.to_string(),
            value: value.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.value);
        self.inner.execute(req).await
    }
}
