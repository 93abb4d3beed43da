mod common;

use common::{entries, entry, feed, feed_with_filters, fetch_error, init_tracing, titles, ScriptedSource, SlowSource};
use feed_monitor::{
    FeedPoller, FetchFailurePolicy, FilterClause, FilterRule, MonitorError, WatermarkState,
};
use std::sync::Arc;
use std::time::Duration;

fn poller(source: Arc<ScriptedSource>, policy: FetchFailurePolicy) -> FeedPoller {
    FeedPoller::new(source, Duration::from_secs(5), policy)
}

#[tokio::test]
async fn test_first_poll_returns_everything_newest_first() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Ok(entries(3))]));
    let poller = poller(source.clone(), FetchFailurePolicy::Wait);
    let mut state = WatermarkState::new();

    let matched = poller.poll(&feed("news", vec![]), &mut state).await.unwrap();

    assert_eq!(titles(&matched), vec!["Entry 3", "Entry 2", "Entry 1"]);
    assert_eq!(state.last_seen.as_deref(), Some("e3"));
    assert!(state.last_polled.is_some());
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_only_entries_above_the_watermark_are_returned() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Ok(entries(2)), Ok(entries(4))]));
    let poller = poller(source, FetchFailurePolicy::Wait);
    let feed = feed("news", vec![]);
    let mut state = WatermarkState::new();

    poller.poll(&feed, &mut state).await.unwrap();
    let matched = poller.poll(&feed, &mut state).await.unwrap();

    assert_eq!(titles(&matched), vec!["Entry 4", "Entry 3"]);
    assert_eq!(state.last_seen.as_deref(), Some("e4"));
}

#[tokio::test]
async fn test_unchanged_feed_yields_nothing_the_second_time() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![]).with_fallback(entries(3)));
    let poller = poller(source.clone(), FetchFailurePolicy::Wait);
    let feed = feed("news", vec![]);
    let mut state = WatermarkState::new();

    let first = poller.poll(&feed, &mut state).await.unwrap();
    let second = poller.poll(&feed, &mut state).await.unwrap();

    assert_eq!(first.len(), 3);
    assert!(second.is_empty());
    assert_eq!(state.last_seen.as_deref(), Some("e3"));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_watermark_moves_even_when_nothing_matches() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
        entry("b", "Bugfix"),
        entry("a", "Chore"),
    ])]));
    let poller = poller(source, FetchFailurePolicy::Wait);
    let rules = vec![FilterRule::new().include(FilterClause::new("title", "(?i)release").unwrap())];
    let mut state = WatermarkState::new();

    let matched = poller
        .poll(&feed_with_filters("news", rules), &mut state)
        .await
        .unwrap();

    assert!(matched.is_empty());
    assert_eq!(state.last_seen.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_filters_keep_only_matching_entries_in_order() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
        entry("4", "Release 1.3"),
        entry("3", "Bugfix"),
        entry("2", "Release 1.2 beta"),
        entry("1", "release 1.1"),
    ])]));
    let poller = poller(source, FetchFailurePolicy::Wait);
    let rules = vec![
        FilterRule::new().include(FilterClause::new("title", "(?i)release").unwrap()),
        FilterRule::new().exclude(FilterClause::new("title", "beta").unwrap()),
    ];
    let mut state = WatermarkState::new();

    let matched = poller
        .poll(&feed_with_filters("news", rules), &mut state)
        .await
        .unwrap();

    assert_eq!(titles(&matched), vec!["Release 1.3", "release 1.1"]);
}

#[tokio::test]
async fn test_failed_fetch_keeps_watermark_and_waits() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Ok(entries(2)), Err(fetch_error())]));
    let poller = poller(source, FetchFailurePolicy::Wait);
    let feed = feed("news", vec![]);
    let mut state = WatermarkState::new();

    poller.poll(&feed, &mut state).await.unwrap();
    let polled_before = state.last_polled;

    let err = poller.poll(&feed, &mut state).await.unwrap_err();

    assert!(matches!(err, MonitorError::Fetch { .. }));
    assert_eq!(state.last_seen.as_deref(), Some("e2"));
    assert_eq!(state.consecutive_failures, 1);
    assert!(state.last_polled >= polled_before);
    assert!(!state.is_due(chrono::Utc::now(), feed.interval));
}

#[tokio::test]
async fn test_retry_policy_leaves_feed_due_after_failure() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Err(fetch_error())]));
    let poller = poller(source, FetchFailurePolicy::Retry);
    let feed = feed("news", vec![]);
    let mut state = WatermarkState::new();

    assert!(poller.poll(&feed, &mut state).await.is_err());

    assert_eq!(state.last_polled, None);
    assert_eq!(state.last_seen, None);
    assert_eq!(state.consecutive_failures, 1);
    assert!(state.is_due(chrono::Utc::now(), feed.interval));
}

#[tokio::test]
async fn test_success_clears_failure_count() {
    init_tracing();
    let source = Arc::new(ScriptedSource::new(vec![
        Err(fetch_error()),
        Err(fetch_error()),
        Ok(entries(1)),
    ]));
    let poller = poller(source, FetchFailurePolicy::Retry);
    let feed = feed("news", vec![]);
    let mut state = WatermarkState::new();

    assert!(poller.poll(&feed, &mut state).await.is_err());
    assert!(poller.poll(&feed, &mut state).await.is_err());
    assert_eq!(state.consecutive_failures, 2);

    let matched = poller.poll(&feed, &mut state).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(state.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_times_out() {
    init_tracing();
    let poller = FeedPoller::new(
        Arc::new(SlowSource(Duration::from_secs(3600))),
        Duration::from_secs(5),
        FetchFailurePolicy::Wait,
    );
    let mut state = WatermarkState::new();

    let err = poller.poll(&feed("slow", vec![]), &mut state).await.unwrap_err();

    assert!(matches!(err, MonitorError::FetchTimeout { seconds: 5, .. }));
    assert_eq!(state.last_seen, None);
    assert_eq!(state.consecutive_failures, 1);
}
