use crate::types::{Entry, Result};
use async_trait::async_trait;

/// Trait for pulling the current entries of a feed from somewhere (HTTP, a
/// file, a test double).
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every entry currently published at `url`, newest first.
    ///
    /// A feed that exists but lists nothing is `Ok(vec![])`; network and
    /// parse failures must come back as errors so they are never mistaken
    /// for an empty feed.
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>>;
}
