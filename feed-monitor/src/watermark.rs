use crate::types::Entry;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Per-feed cursor. Owned by exactly one feed's poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatermarkState {
    /// Identity of the newest entry seen so far. `None` until the first
    /// successful fetch that returned anything.
    pub last_seen: Option<String>,
    pub last_polled: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl WatermarkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never polled, or strictly more than `interval` has elapsed since.
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.last_polled {
            None => true,
            // A clock that stepped backwards yields a negative span: not due.
            Some(last) => now
                .signed_duration_since(last)
                .to_std()
                .map(|elapsed| elapsed > interval)
                .unwrap_or(false),
        }
    }

    /// Move the cursor forward after a successful fetch.
    pub fn advance(&mut self, next: Option<String>, now: DateTime<Utc>) {
        if next.is_some() {
            self.last_seen = next;
        }
        self.last_polled = Some(now);
        self.consecutive_failures = 0;
    }
}

/// Split a newest-first fetch into the entries not seen before and the
/// identity the watermark should move to.
///
/// Scanning stops at the first entry whose identity equals `watermark`
/// (exact comparison); that entry and everything older is dropped. When the
/// watermark is unset or absent from `fetched`, every entry is new. An empty
/// fetch keeps the previous watermark.
pub fn diff_new(fetched: &[Entry], watermark: Option<&str>) -> (Vec<Entry>, Option<String>) {
    let new_entries: Vec<Entry> = fetched
        .iter()
        .take_while(|entry| Some(entry.identity()) != watermark)
        .cloned()
        .collect();

    let next = fetched
        .first()
        .map(|newest| newest.identity().to_string())
        .or_else(|| watermark.map(str::to_string));

    (new_entries, next)
}
