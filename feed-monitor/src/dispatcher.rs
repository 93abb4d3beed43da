use crate::registry::NotifierRegistry;
use crate::types::{Entry, FeedConfig, MonitorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Outcome of dispatching one entry to a feed's notifiers.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Notifier names that accepted the entry.
    pub delivered: Vec<String>,
    /// Bound names with no registered notifier.
    pub skipped: Vec<String>,
    /// One `PluginInvocation` error per notifier that failed or timed out.
    pub failures: Vec<MonitorError>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Hands matched entries to every notifier bound on their feed.
#[derive(Clone)]
pub struct NotificationDispatcher {
    registry: Arc<NotifierRegistry>,
    notify_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<NotifierRegistry>, notify_timeout: Duration) -> Self {
        Self {
            registry,
            notify_timeout,
        }
    }

    pub fn registry(&self) -> &NotifierRegistry {
        &self.registry
    }

    /// Invoke each of `feed`'s notifier bindings with `entry`, in order.
    ///
    /// Fails up front, without invoking anything, when no notifier is
    /// registered at all or the feed binds none. Otherwise a failing or
    /// unresolved binding never stops the remaining ones; they are collected
    /// in the returned report.
    pub async fn dispatch(&self, feed: &FeedConfig, entry: &Entry) -> Result<DispatchReport> {
        if self.registry.is_empty() {
            return Err(MonitorError::DispatchPrecondition("no notifiers loaded".to_string()));
        }
        if feed.notifiers.is_empty() {
            return Err(MonitorError::DispatchPrecondition(format!(
                "no notifiers configured for feed {}",
                feed.name
            )));
        }

        let mut report = DispatchReport::default();

        for binding in &feed.notifiers {
            let Some(notifier) = self.registry.get(&binding.name) else {
                warn!("Feed {}: notifier {} is not loaded, skipping", feed.name, binding.name);
                report.skipped.push(binding.name.clone());
                continue;
            };

            let config = match binding.config_text() {
                Ok(config) => config,
                Err(e) => {
                    error!("Feed {}: cannot serialize config for {}: {}", feed.name, binding.name, e);
                    report.failures.push(MonitorError::PluginInvocation {
                        name: binding.name.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            debug!("Sending {:?} from {} to {}", entry.title, feed.name, binding.name);
            let outcome = tokio::time::timeout(
                self.notify_timeout,
                notifier.notify(entry, &feed.name, &config),
            )
            .await;

            match outcome {
                Ok(Ok(())) => report.delivered.push(binding.name.clone()),
                Ok(Err(e)) => {
                    error!("Feed {}: notifier {} failed: {:#}", feed.name, binding.name, e);
                    report.failures.push(MonitorError::PluginInvocation {
                        name: binding.name.clone(),
                        message: format!("{:#}", e),
                    });
                }
                Err(_) => {
                    error!(
                        "Feed {}: notifier {} timed out after {:?}",
                        feed.name, binding.name, self.notify_timeout
                    );
                    report.failures.push(MonitorError::PluginInvocation {
                        name: binding.name.clone(),
                        message: format!("timed out after {:?}", self.notify_timeout),
                    });
                }
            }
        }

        Ok(report)
    }
}
