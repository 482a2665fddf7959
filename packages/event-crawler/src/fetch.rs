//! HTTP fetch collaborator.
//!
//! The crawler only reacts to successfully-delivered response bodies;
//! transport policy (timeouts, TLS) lives here. Kept behind a trait so the
//! worker loop can be driven by a scripted fetcher in tests.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::types::PageRequest;

/// Fetches the response body for a page request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> FetchResult<String>;
}

/// reqwest-backed fetcher: JSON POST for listing requests, GET for detail
/// pages.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to create HTTP client"),
            user_agent: "EventCrawler/0.1".to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> FetchResult<String> {
        let url = request.url().clone();
        debug!(url = %url, label = request.label(), "fetch starting");

        let builder = match request {
            PageRequest::Listing { query, .. } => self
                .client
                .post(url.clone())
                .header("Content-Type", "application/json")
                .json(query),
            PageRequest::Detail { .. } => self.client.get(url.clone()),
        };

        let response = builder
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}
