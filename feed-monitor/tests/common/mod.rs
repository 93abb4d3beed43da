#![allow(dead_code)]

// Shared fixtures for the integration tests: entries, feeds, fake feed
// sources and fake notifiers.

use async_trait::async_trait;
use feed_monitor::{
    Entry, FeedConfig, FeedSource, FilterRule, MonitorError, Notifier, NotifierBinding, Result,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn entry(id: &str, title: &str) -> Entry {
    Entry {
        id: id.to_string(),
        title: title.to_string(),
        link: format!("https://example.com/posts/{}", id),
        ..Default::default()
    }
}

/// `count` entries e<count>..e1, newest first.
pub fn entries(count: usize) -> Vec<Entry> {
    (1..=count)
        .rev()
        .map(|i| entry(&format!("e{}", i), &format!("Entry {}", i)))
        .collect()
}

pub fn feed(name: &str, notifiers: Vec<NotifierBinding>) -> FeedConfig {
    FeedConfig {
        name: name.to_string(),
        url: format!("https://example.com/{}.xml", name),
        interval: Duration::from_secs(60),
        filters: Vec::new(),
        notifiers,
    }
}

pub fn feed_with_filters(name: &str, filters: Vec<FilterRule>) -> FeedConfig {
    FeedConfig {
        filters,
        ..feed(name, vec![NotifierBinding::new("recorder")])
    }
}

pub fn titles(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.title.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Feed sources
// ---------------------------------------------------------------------------

/// Plays back queued results in order, then keeps answering with `fallback`.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Entry>>>>,
    fallback: Vec<Entry>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<Entry>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fallback(mut self, fallback: Vec<Entry>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, _url: &str) -> Result<Vec<Entry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Fixed entries per URL; unknown URLs fail.
#[derive(Default)]
pub struct StaticSource {
    feeds: HashMap<String, Vec<Entry>>,
}

impl StaticSource {
    pub fn with_feed(mut self, url: &str, entries: Vec<Entry>) -> Self {
        self.feeds.insert(url.to_string(), entries);
        self
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>> {
        self.feeds.get(url).cloned().ok_or_else(|| MonitorError::Fetch {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Never answers within any sane timeout.
pub struct SlowSource(pub Duration);

#[async_trait]
impl FeedSource for SlowSource {
    async fn fetch(&self, _url: &str) -> Result<Vec<Entry>> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

pub fn fetch_error() -> MonitorError {
    MonitorError::Fetch {
        url: "https://example.com/feed.xml".to_string(),
        reason: "connection reset".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub feed: String,
    pub title: String,
    pub config: String,
}

/// Remembers every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivered_titles(&self) -> Vec<String> {
        self.deliveries().into_iter().map(|d| d.title).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, entry: &Entry, feed_name: &str, config: &str) -> anyhow::Result<()> {
        self.deliveries.lock().unwrap().push(Delivery {
            feed: feed_name.to_string(),
            title: entry.title.clone(),
            config: config.to_string(),
        });
        Ok(())
    }
}

/// Always fails, counting attempts.
#[derive(Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _entry: &Entry, _feed_name: &str, _config: &str) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("push service unavailable")
    }
}

/// Never completes.
pub struct HangingNotifier;

#[async_trait]
impl Notifier for HangingNotifier {
    async fn notify(&self, _entry: &Entry, _feed_name: &str, _config: &str) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
