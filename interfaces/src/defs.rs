use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item of a syndication feed, as handed to notifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable identifier from the feed (guid / atom id). May be empty.
    pub id: String,
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub content: String,
    pub description: String,
    pub authors: Vec<String>,
}

impl Entry {
    /// The identity used for watermark comparisons: the feed's own id when
    /// it has one, otherwise the title.
    pub fn identity(&self) -> &str {
        if self.id.is_empty() {
            &self.title
        } else {
            &self.id
        }
    }

    /// First author's name, or "" when the entry carries none.
    pub fn first_author(&self) -> &str {
        self.authors.first().map(String::as_str).unwrap_or("")
    }
}

// Object style note:
// Notifiers are registered once at startup and then shared read-only across
// every feed task, hence `Send + Sync` and `&self`.
// The `config` argument is the feed's binding configuration serialized to
// JSON text, so a notifier never needs the monitor's configuration types.

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an alert for `entry`, seen on the feed called `feed_name`.
    async fn notify(&self, entry: &Entry, feed_name: &str, config: &str) -> Result<()>;
}
