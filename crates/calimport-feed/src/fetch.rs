//! HTTP fetch of the raw ICS feed.
//!
//! One GET per call, no retry. Failures are classified into
//! [`FeedErrorCode`](crate::error::FeedErrorCode)s so callers can tell a
//! flaky network from a feed that is gone.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{FeedError, FeedResult};

/// Configuration for fetching a feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Location of the ICS document.
    pub url: Url,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl FeedConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a feed configuration for the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(url.as_ref())?;
        Ok(Self {
            url: parsed,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calimport/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Fetches the raw feed text.
pub struct FeedClient {
    client: Client,
    config: FeedConfig,
}

impl FeedClient {
    /// Creates a client for the given feed.
    pub fn new(config: FeedConfig) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FeedError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Downloads the feed and returns its body.
    pub async fn fetch(&self) -> FeedResult<String> {
        debug!(url = %self.config.url, "Fetching feed");

        let response = self
            .client
            .get(self.config.url.clone())
            .send()
            .await
            .map_err(|e| FeedError::network(format!("Request failed: {}", e)).with_source(e))?;

        let body = handle_response(response).await?;
        debug!(bytes = body.len(), "Fetched feed");
        Ok(body)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

/// Maps the response status to a body or an error.
async fn handle_response(response: Response) -> FeedResult<String> {
    let status = response.status();
    trace!(status = %status, "Received response");

    match status {
        s if s.is_success() => response
            .text()
            .await
            .map_err(|e| FeedError::network(format!("Failed to read response: {}", e))),
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            Err(FeedError::rejected(format!("Feed not found ({})", status)))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(FeedError::rejected(format!("Access to feed denied ({})", status)))
        }
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            Err(FeedError::server(format!("Server error ({}): {}", s, body)))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            Err(FeedError::invalid_response(format!(
                "Unexpected status {}: {}",
                s, body
            )))
        }
    }
}
