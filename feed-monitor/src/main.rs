use anyhow::Context;
use clap::{Parser, ValueEnum};
use feed_monitor::notifiers::{GotifyConfig, GotifyNotifier};
use feed_monitor::{
    load_env_file, FeedPoller, Fetcher, MonitorConfig, NotificationDispatcher, NotifierRegistry,
    Scheduler,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PLUGIN_DIR: &str = "./plugins";
const DOTENV_FILE: &str = ".env";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Read `.env` before loading the configuration
    Dev,
    /// Use the process environment as is
    Prod,
}

#[derive(Parser, Debug)]
#[command(name = "feed-monitor", version, about = "Watch syndication feeds and notify on new matching entries")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Directory scanned for notifier programs (overrides `plugin_dir`)
    #[arg(long)]
    plugin_dir: Option<PathBuf>,

    /// Poll every feed once, dispatch, and exit
    #[arg(long)]
    once: bool,

    /// `dev` also reads `.env` from the working directory
    #[arg(long, value_enum, default_value_t = Mode::Dev)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before the subscriber, so RUST_LOG may come from .env too
    let dotenv = (cli.mode == Mode::Dev).then(|| load_env_file(Path::new(DOTENV_FILE)));

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(Err(e)) = dotenv {
        warn!("Error loading .env file: {}", e);
    }

    let (config, registry, fetcher) = match startup(&cli) {
        Ok(parts) => parts,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(1);
        }
    };

    let poller = FeedPoller::new(
        Arc::new(fetcher),
        config.runtime.fetch_timeout,
        config.runtime.fetch_failure,
    );
    let dispatcher = NotificationDispatcher::new(Arc::new(registry), config.runtime.notify_timeout);
    let mut scheduler = Scheduler::new(config.feeds, poller, dispatcher, config.runtime.tick);

    if cli.once {
        let dispatched = scheduler.run_once().await;
        info!("Single pass done, {} entries dispatched", dispatched);
    } else {
        scheduler
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Cannot listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await;
    }

    ExitCode::SUCCESS
}

/// Everything that must succeed before the first poll. Failures here exit 1.
fn startup(cli: &Cli) -> anyhow::Result<(MonitorConfig, NotifierRegistry, Fetcher)> {
    info!("Reading config file: {}", cli.config.display());
    let mut config = MonitorConfig::load(&cli.config).context("Error parsing config file")?;
    if let Some(dir) = &cli.plugin_dir {
        config.plugin_dir = Some(dir.clone());
    }

    let client = reqwest::Client::builder()
        .timeout(config.runtime.notify_timeout)
        .build()
        .context("Error building HTTP client")?;
    let gotify_defaults = GotifyConfig {
        url: std::env::var("GOTIFY_URL").unwrap_or_default(),
        token: std::env::var("GOTIFY_TOKEN").unwrap_or_default(),
    };

    let mut registry = NotifierRegistry::new();
    registry.register("gotify", Arc::new(GotifyNotifier::new(client).with_defaults(gotify_defaults)));

    match &config.plugin_dir {
        Some(dir) => {
            registry.discover(dir).context("Error loading plugins")?;
        }
        None if Path::new(DEFAULT_PLUGIN_DIR).is_dir() => {
            registry
                .discover(Path::new(DEFAULT_PLUGIN_DIR))
                .context("Error loading plugins")?;
        }
        None => {}
    }
    info!("Loaded notifiers: {:?}", registry.names());

    if config.strict_notifiers {
        registry
            .validate(&config.feeds)
            .context("Notifier referenced in config is not loaded")?;
    }

    let fetcher = Fetcher::new(config.fetch.clone()).context("Error building feed fetcher")?;
    Ok((config, registry, fetcher))
}
