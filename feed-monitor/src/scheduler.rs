use crate::dispatcher::NotificationDispatcher;
use crate::poller::FeedPoller;
use crate::types::FeedConfig;
use crate::watermark::WatermarkState;
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// A feed together with the only copy of its watermark.
pub struct FeedTask {
    feed: FeedConfig,
    state: WatermarkState,
    poller: FeedPoller,
    dispatcher: NotificationDispatcher,
}

impl FeedTask {
    pub fn feed(&self) -> &FeedConfig {
        &self.feed
    }

    pub fn state(&self) -> &WatermarkState {
        &self.state
    }

    /// Poll the feed if it is due and dispatch whatever matched.
    /// Returns the number of entries handed to the dispatcher.
    pub async fn cycle(&mut self) -> usize {
        if !self.state.is_due(Utc::now(), self.feed.interval) {
            return 0;
        }
        debug!("Feed {} is due (last polled {:?})", self.feed.name, self.state.last_polled);

        // Errors are logged by the poller; the feed just waits for its next turn.
        let Ok(matched) = self.poller.poll(&self.feed, &mut self.state).await else {
            return 0;
        };

        for entry in &matched {
            match self.dispatcher.dispatch(&self.feed, entry).await {
                Ok(report) if !report.is_success() => {
                    warn!(
                        "Feed {}: {} of {} notifiers failed for {:?}",
                        self.feed.name,
                        report.failures.len(),
                        self.feed.notifiers.len(),
                        entry.title
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Feed {}: {}", self.feed.name, e),
            }
        }
        matched.len()
    }
}

/// Drives every feed on its own interval, forever.
pub struct Scheduler {
    tasks: Vec<FeedTask>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(
        feeds: Vec<FeedConfig>,
        poller: FeedPoller,
        dispatcher: NotificationDispatcher,
        tick: Duration,
    ) -> Self {
        let tasks = feeds
            .into_iter()
            .map(|feed| FeedTask {
                feed,
                state: WatermarkState::new(),
                poller: poller.clone(),
                dispatcher: dispatcher.clone(),
            })
            .collect();

        Self { tasks, tick }
    }

    pub fn tasks(&self) -> &[FeedTask] {
        &self.tasks
    }

    /// One sequential pass over the due feeds, in declaration order.
    pub async fn run_once(&mut self) -> usize {
        let mut dispatched = 0;
        for task in &mut self.tasks {
            dispatched += task.cycle().await;
        }
        dispatched
    }

    /// Spawn one task per feed and keep them running until `shutdown`
    /// resolves. Each task wakes every `tick` and polls its feed when due.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.tasks.is_empty() {
            warn!("No feeds configured, nothing to schedule");
            return;
        }
        info!("Starting scheduler with {} feeds (tick {:?})", self.tasks.len(), self.tick);

        let tick = self.tick;
        let mut running: JoinSet<()> = JoinSet::new();
        for mut task in self.tasks {
            running.spawn(async move {
                let mut ticker = interval(tick);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    task.cycle().await;
                }
            });
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down scheduler");
                    break;
                }
                joined = running.join_next() => match joined {
                    Some(Err(e)) => error!("Feed task ended unexpectedly: {}", e),
                    Some(Ok(())) => {}
                    None => break,
                },
            }
        }
        running.abort_all();
    }
}
