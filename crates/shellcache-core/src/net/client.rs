use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};

use super::error::FetchError;
use super::types::{Request, Response};

/// HTTP request timeout in seconds.
/// The interceptor never abandons a hung request in favor of the cache,
/// so this is the only bound on how long an intercept can take.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Abstraction over the network for testability.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Perform one request. Any completed HTTP exchange is `Ok`, whatever
    /// the status; only an outright transport failure is `Err`.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Network provider backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: String,
}

impl HttpNetwork {
    pub fn new(origin: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        })
    }

    /// Manifest entries and intercepted page requests are origin-relative;
    /// anything else is taken as a full URL.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.origin, url)
        } else {
            url.to_string()
        }
    }
}

#[async_trait]
impl NetworkProvider for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = self.resolve(&request.url);
        let response = self.client.get(&url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?.to_vec();

        Ok(Response {
            url: request.url.clone(),
            status,
            content_type,
            body,
        })
    }
}
