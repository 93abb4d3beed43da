use crate::notifiers::CommandNotifier;
use crate::types::{FeedConfig, MonitorError, Notifier, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name -> notifier lookup. Filled once at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct NotifierRegistry {
    notifiers: HashMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, notifier: Arc<dyn Notifier>) {
        let name = name.into();
        if self.notifiers.insert(name.clone(), notifier).is_some() {
            warn!("Notifier {} registered twice; keeping the latest", name);
        } else {
            debug!("Registered notifier: {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Notifier>> {
        self.notifiers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.notifiers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.notifiers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register every executable in `dir` as a [`CommandNotifier`] named by
    /// its file stem. Both `dir/<name>` and `dir/<name>/<name>` are picked up.
    pub fn discover(&mut self, dir: &Path) -> Result<usize> {
        info!("Loading plugins from {}", dir.display());

        let read_dir = std::fs::read_dir(dir).map_err(|e| {
            MonitorError::PluginLoad(format!("cannot read plugin directory {}: {}", dir.display(), e))
        })?;

        let mut found = 0;
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            let Some(name) = plugin_name(&path) else {
                continue;
            };

            let candidate = if path.is_dir() {
                path.join(&name)
            } else {
                path.clone()
            };
            if !is_executable(&candidate) {
                debug!("Skipping non-executable {}", candidate.display());
                continue;
            }

            info!("Loading plugin: {} ({})", name, candidate.display());
            self.register(name, Arc::new(CommandNotifier::new(candidate)));
            found += 1;
        }

        Ok(found)
    }

    /// Fail when a feed binds a notifier name nothing was registered under.
    pub fn validate(&self, feeds: &[FeedConfig]) -> Result<()> {
        for feed in feeds {
            for binding in &feed.notifiers {
                if !self.contains(&binding.name) {
                    return Err(MonitorError::PluginResolution {
                        name: binding.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("notifiers", &self.names())
            .finish()
    }
}

fn plugin_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || stem.starts_with('.') {
        return None;
    }
    Some(stem.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
