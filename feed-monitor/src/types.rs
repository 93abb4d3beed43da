use crate::filter::FilterRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub use interfaces::{Entry, Notifier};

/// A configured feed. Immutable once the configuration has been loaded.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub interval: Duration,
    pub filters: Vec<FilterRule>,
    pub notifiers: Vec<NotifierBinding>,
}

/// Notifier name plus the opaque key/value configuration handed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierBinding {
    pub name: String,
    pub config: BTreeMap<String, String>,
}

impl NotifierBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// The configuration as JSON text, the form notifiers receive it in.
    pub fn config_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.config)?)
    }
}

/// What a failed fetch does to the feed's `last_polled` instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Advance `last_polled`, so a broken feed is retried after a full interval.
    #[default]
    Wait,
    /// Keep `last_polled`, so the next scheduler tick retries.
    Retry,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "feed-monitor/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Timing knobs shared by the poller, the dispatcher and the scheduler.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub tick: Duration,
    pub fetch_timeout: Duration,
    pub notify_timeout: Duration,
    pub fetch_failure: FetchFailurePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1000),
            fetch_timeout: Duration::from_secs(60),
            notify_timeout: Duration::from_secs(30),
            fetch_failure: FetchFailurePolicy::Wait,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetching {url} timed out after {seconds}s")]
    FetchTimeout { url: String, seconds: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("No notifier registered under the name {name:?}")]
    PluginResolution { name: String },

    #[error("Notifier {name:?} failed: {message}")]
    PluginInvocation { name: String, message: String },

    #[error("Cannot dispatch: {0}")]
    DispatchPrecondition(String),

    #[error("Plugin load error: {0}")]
    PluginLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for MonitorError {
    fn from(e: config::ConfigError) -> Self {
        MonitorError::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for MonitorError {
    fn from(e: serde_yaml::Error) -> Self {
        MonitorError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
