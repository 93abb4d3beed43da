use crate::filter::passes_all;
use crate::traits::FeedSource;
use crate::types::{Entry, FeedConfig, FetchFailurePolicy, MonitorError, Result};
use crate::watermark::{diff_new, WatermarkState};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs one fetch -> diff -> filter -> advance cycle for a feed.
#[derive(Clone)]
pub struct FeedPoller {
    source: Arc<dyn FeedSource>,
    fetch_timeout: Duration,
    on_failure: FetchFailurePolicy,
}

impl FeedPoller {
    pub fn new(source: Arc<dyn FeedSource>, fetch_timeout: Duration, on_failure: FetchFailurePolicy) -> Self {
        Self {
            source,
            fetch_timeout,
            on_failure,
        }
    }

    /// Poll `feed` and return its new entries that pass every filter rule,
    /// newest first.
    ///
    /// On success the watermark moves to the newest fetched entry and
    /// `last_polled` to now, even when nothing matched. On failure the
    /// watermark is left alone and `last_polled` follows the
    /// [`FetchFailurePolicy`].
    pub async fn poll(&self, feed: &FeedConfig, state: &mut WatermarkState) -> Result<Vec<Entry>> {
        debug!("Checking feed: {}", feed.name);

        let fetched = match self.fetch(&feed.url).await {
            Ok(entries) => entries,
            Err(e) => {
                state.consecutive_failures += 1;
                if self.on_failure == FetchFailurePolicy::Wait {
                    state.last_polled = Some(Utc::now());
                }
                warn!(
                    "Feed {} failed ({} in a row): {}",
                    feed.name, state.consecutive_failures, e
                );
                return Err(e);
            }
        };

        let (new_entries, next) = diff_new(&fetched, state.last_seen.as_deref());
        let matched: Vec<Entry> = new_entries
            .into_iter()
            .filter(|entry| passes_all(entry, &feed.filters))
            .collect();

        info!(
            "Feed {}: {} fetched, {} matched since {:?}",
            feed.name,
            fetched.len(),
            matched.len(),
            state.last_seen
        );

        state.advance(next, Utc::now());
        Ok(matched)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Entry>> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::FetchTimeout {
                url: url.to_string(),
                seconds: self.fetch_timeout.as_secs(),
            }),
        }
    }
}
