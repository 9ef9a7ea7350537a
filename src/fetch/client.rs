use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared HTTP requests. Wrappers such as
/// [`UrlParam`](super::auth::UrlParam) decorate a request before handing it on.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
