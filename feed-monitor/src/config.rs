//! Configuration loading.
//!
//! [`MonitorFile::load`] reads the YAML file named on the command line and
//! layers `FEED_MONITOR_*` environment variables over its top-level settings.
//! The `monitor` list is decoded straight from the YAML text, so notifier
//! settings reach plugins exactly as written (`chatId: 0123` stays `"0123"`).
//! [`MonitorFile::into_config`] validates the result and compiles filter
//! patterns, producing the [`MonitorConfig`] the rest of the crate runs on.

use crate::filter::{FilterClause, FilterRule};
use crate::types::{
    FeedConfig, FetchConfig, FetchFailurePolicy, MonitorError, NotifierBinding, Result,
    RuntimeConfig,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

/// The configuration file as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorFile {
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,
    #[serde(default)]
    pub fetch_failure: FetchFailurePolicy,
    #[serde(default = "default_strict_notifiers")]
    pub strict_notifiers: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Filled from the raw YAML, never from the environment.
    #[serde(skip)]
    pub monitor: Vec<MonitorItem>,
}

/// The `monitor` list on its own.
#[derive(Debug, Default, Deserialize)]
struct FeedList {
    #[serde(default)]
    monitor: Vec<MonitorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorItem {
    pub feed: FeedSection,
}

/// `monitor[].feed`
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    pub name: String,
    pub url: String,
    pub interval: u64,
    #[serde(default)]
    pub filters: Vec<FilterSection>,
    /// Each item maps a notifier name to its settings, e.g.
    /// `- gotify: { url: ..., token: ... }`. A bare `- gotify:` has none.
    #[serde(default)]
    pub notifiers: Vec<BTreeMap<String, Option<BTreeMap<String, String>>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSection {
    #[serde(default)]
    pub include: Option<ClauseSection>,
    #[serde(default)]
    pub exclude: Option<ClauseSection>,
}

/// An empty `element` means the clause is not set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClauseSection {
    #[serde(default)]
    pub element: String,
    #[serde(default)]
    pub matches: String,
}

fn default_tick_millis() -> u64 { 1000 }
fn default_fetch_timeout_secs() -> u64 { 60 }
fn default_notify_timeout_secs() -> u64 { 30 }
fn default_strict_notifiers() -> bool { true }

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Everything the monitor needs at runtime, validated.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub feeds: Vec<FeedConfig>,
    pub runtime: RuntimeConfig,
    pub fetch: FetchConfig,
    pub plugin_dir: Option<PathBuf>,
    pub strict_notifiers: bool,
}

impl MonitorFile {
    /// Read `path` as YAML with `FEED_MONITOR_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Reading config file: {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(
            &text,
            Some(config::Environment::with_prefix("FEED_MONITOR").try_parsing(true)),
        )
    }

    /// Parse YAML text without consulting the environment.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::parse(text, None)
    }

    fn parse(text: &str, env: Option<config::Environment>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Yaml));
        if let Some(env) = env {
            builder = builder.add_source(env);
        }
        let mut file: MonitorFile = builder.build()?.try_deserialize()?;

        // The config crate turns scalars like `0123` into numbers; feed
        // entries are read from the text as written instead.
        let feeds: FeedList = serde_yaml::from_str(text)?;
        file.monitor = feeds.monitor;
        Ok(file)
    }

    pub fn into_config(self) -> Result<MonitorConfig> {
        if self.monitor.is_empty() {
            return Err(MonitorError::Config("no feeds under `monitor`".to_string()));
        }
        for (key, value) in [
            ("tick_millis", self.tick_millis),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("notify_timeout_secs", self.notify_timeout_secs),
        ] {
            if value == 0 {
                return Err(MonitorError::Config(format!("{} must be greater than 0", key)));
            }
        }

        let mut seen = HashSet::new();
        let mut feeds = Vec::with_capacity(self.monitor.len());
        for item in self.monitor {
            let feed = item.feed.into_feed_config()?;
            if !seen.insert(feed.name.clone()) {
                return Err(MonitorError::Config(format!("duplicate feed name {:?}", feed.name)));
            }
            feeds.push(feed);
        }

        let mut fetch = FetchConfig::default();
        if let Some(user_agent) = self.user_agent {
            fetch.user_agent = user_agent;
        }

        Ok(MonitorConfig {
            feeds,
            runtime: RuntimeConfig {
                tick: Duration::from_millis(self.tick_millis),
                fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
                notify_timeout: Duration::from_secs(self.notify_timeout_secs),
                fetch_failure: self.fetch_failure,
            },
            fetch,
            plugin_dir: self.plugin_dir,
            strict_notifiers: self.strict_notifiers,
        })
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        MonitorFile::load(path)?.into_config()
    }
}

/// Export the `KEY=value` lines of a dotenv file into the process
/// environment. Variables that are already set keep their value.
pub fn load_env_file(path: &Path) -> Result<()> {
    dotenvy::from_path(path).map_err(|e| {
        MonitorError::Config(format!("cannot load {}: {}", path.display(), e))
    })?;
    debug!("Loaded environment from {}", path.display());
    Ok(())
}

impl FeedSection {
    fn into_feed_config(self) -> Result<FeedConfig> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::Config("feed without a name".to_string()));
        }
        if self.interval == 0 {
            return Err(MonitorError::Config(format!(
                "feed {:?}: interval must be greater than 0",
                self.name
            )));
        }
        validate_feed_url(&self.url)
            .map_err(|e| MonitorError::Config(format!("feed {:?}: {}", self.name, e)))?;

        let filters = self
            .filters
            .iter()
            .map(FilterSection::compile)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| match e {
                MonitorError::Config(msg) => MonitorError::Config(format!("feed {:?}: {}", self.name, msg)),
                other => other,
            })?;

        let notifiers = self
            .notifiers
            .into_iter()
            .flatten()
            .map(|(name, config)| NotifierBinding {
                name,
                config: config.unwrap_or_default(),
            })
            .collect();

        Ok(FeedConfig {
            name: self.name,
            url: self.url,
            interval: Duration::from_secs(self.interval),
            filters,
            notifiers,
        })
    }
}

impl FilterSection {
    fn compile(&self) -> Result<FilterRule> {
        let mut rule = FilterRule::new();
        if let Some(clause) = self.include.as_ref().filter(|c| !c.element.is_empty()) {
            rule = rule.include(FilterClause::new(&clause.element, &clause.matches)?);
        }
        if let Some(clause) = self.exclude.as_ref().filter(|c| !c.element.is_empty()) {
            rule = rule.exclude(FilterClause::new(&clause.element, &clause.matches)?);
        }
        Ok(rule)
    }
}

fn validate_feed_url(raw: &str) -> std::result::Result<(), String> {
    let parsed = Url::parse(raw).map_err(|e| format!("invalid URL {:?}: {}", raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported URL scheme {:?}", parsed.scheme()));
    }
    if parsed.host().is_none() {
        return Err(format!("URL {:?} has no host", raw));
    }
    Ok(())
}
