mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};

/// Issues a GET through `client` and returns the body of a successful response.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL {url}"))?,
    );

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers every request with a fixed status.
    struct StatusClient(u16);

    #[async_trait]
    impl HttpClient for StatusClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            Ok(reqwest::Response::from(
                http::Response::builder()
                    .status(self.0)
                    .body("[]")
                    .unwrap(),
            ))
        }
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let body = fetch_bytes(&StatusClient(200), "https://example.org/stations")
            .await
            .unwrap();
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let err = fetch_bytes(&StatusClient(503), "https://example.org/stations")
            .await
            .unwrap_err();

        let status = err
            .downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status);
        assert_eq!(status, Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_invalid_url_fails() {
        assert!(fetch_bytes(&StatusClient(200), "not a url").await.is_err());
    }
}
