use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{Entry, FetchConfig, MonitorError, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// HTTP implementation of [`FeedSource`].
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    parser: FeedParser,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            parser: FeedParser::new(),
        })
    }

    /// Download the raw feed document, retrying transient failures.
    pub async fn fetch_document(&self, url: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let err = match self.fetch_once(url).await {
                Ok(body) => {
                    info!(
                        "Fetched feed: {} ({} bytes in {}ms)",
                        url,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                Err(e) => e,
            };

            if attempt >= self.config.max_retries || !is_transient(&err) {
                error!("Failed to fetch feed after {} attempts: {}", attempt + 1, url);
                return Err(err);
            }
            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} failed for {}, retrying in {:?}: {}", attempt + 1, url, delay, err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(MonitorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit {
                return Err(MonitorError::FeedTooLarge {
                    size_mb: content_length as usize / (1024 * 1024),
                });
            }
        }

        let body = response.bytes().await.map_err(|e| transport_error(url, e))?;
        // Chunked responses carry no content length
        if body.len() > limit {
            return Err(MonitorError::FeedTooLarge {
                size_mb: body.len() / (1024 * 1024),
            });
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl FeedSource for Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>> {
        let body = self.fetch_document(url).await?;
        self.parser.parse_feed(&body)
    }
}

/// Connection, timeout and body errors become [`MonitorError::Fetch`] with
/// the whole cause chain; request building and redirect errors stay
/// [`MonitorError::Http`].
fn transport_error(url: &str, err: reqwest::Error) -> MonitorError {
    if err.is_builder() || err.is_redirect() {
        return MonitorError::Http(err);
    }
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    MonitorError::Fetch {
        url: url.to_string(),
        reason,
    }
}

/// Network errors, 5xx and 429 are worth another attempt; everything else is not.
fn is_transient(err: &MonitorError) -> bool {
    match err {
        MonitorError::Fetch { .. } => true,
        MonitorError::HttpStatus { status, .. } => {
            *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
        }
        _ => false,
    }
}
