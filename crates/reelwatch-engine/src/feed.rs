//! Upstream programming feed.

use crate::config::AppConfig;
use async_trait::async_trait;
use reelwatch_core::errors::{ExError, ExErrorKind, Result};
use reelwatch_core::model::RawFeedResponse;
use reelwatch_core_types::Sensitive;
use std::time::Duration;

/// Source of raw feed responses.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current programming.
    ///
    /// # Errors
    ///
    /// `Fetch` on transport failure, non-2xx status or an undecodable body;
    /// `Timeout` if the request exceeds its deadline.
    async fn fetch(&self) -> Result<RawFeedResponse>;
}

/// `GET <base>/<cinema_id>/programming`
pub fn programming_url(base_url: &str, cinema_id: &str) -> String {
    format!("{}/{}/programming", base_url.trim_end_matches('/'), cinema_id)
}

/// Bearer-authenticated HTTP client for the programming feed.
pub struct HttpFeedClient {
    client: reqwest::Client,
    url: String,
    token: Sensitive<String>,
}

impl HttpFeedClient {
    /// # Errors
    ///
    /// `Internal` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        cinema_id: &str,
        token: Sensitive<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("build_feed_client")
                    .with_message(e.to_string())
            })?;

        Ok(Self {
            client,
            url: programming_url(base_url, cinema_id),
            token,
        })
    }

    /// # Errors
    ///
    /// As [`HttpFeedClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.feed_base_url,
            &config.cinema_id,
            config.feed_token.clone(),
            config.http_timeout(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self) -> Result<RawFeedResponse> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExError::new(ExErrorKind::Fetch)
                .with_op("fetch_feed")
                .with_location(self.url.clone())
                .with_message(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&self.url, e))?;

        tracing::debug!(url = %self.url, size_bytes = body.len(), "fetched feed");

        RawFeedResponse::from_slice(&body).map_err(|e| {
            ExError::new(ExErrorKind::Fetch)
                .with_op("fetch_feed")
                .with_location(self.url.clone())
                .with_message("undecodable feed body")
                .with_source(e)
        })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> ExError {
    let kind = if err.is_timeout() {
        ExErrorKind::Timeout
    } else {
        ExErrorKind::Fetch
    };
    // The location field already carries the URL
    ExError::new(kind)
        .with_op("fetch_feed")
        .with_location(url.to_string())
        .with_message(err.without_url().to_string())
}
