use crate::types::{Entry, Notifier};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

/// `url` / `token` for a Gotify server. Either may come from the feed's
/// notifier binding or from the defaults the notifier was built with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GotifyConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
}

impl GotifyConfig {
    fn or(self, defaults: &GotifyConfig) -> GotifyConfig {
        GotifyConfig {
            url: if self.url.is_empty() { defaults.url.clone() } else { self.url },
            token: if self.token.is_empty() { defaults.token.clone() } else { self.token },
        }
    }
}

/// Push notifications through a Gotify server.
pub struct GotifyNotifier {
    client: Client,
    defaults: GotifyConfig,
}

impl GotifyNotifier {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            defaults: GotifyConfig::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: GotifyConfig) -> Self {
        self.defaults = defaults;
        self
    }
}

#[async_trait]
impl Notifier for GotifyNotifier {
    async fn notify(&self, entry: &Entry, feed_name: &str, config: &str) -> Result<()> {
        let parsed: GotifyConfig = if config.trim().is_empty() {
            GotifyConfig::default()
        } else {
            serde_json::from_str(config).context("invalid gotify config")?
        };
        let settings = parsed.or(&self.defaults);
        if settings.url.is_empty() || settings.token.is_empty() {
            bail!("gotify url and token must be set (binding config or GOTIFY_URL / GOTIFY_TOKEN)");
        }

        let title = format!("New item in {}", feed_name);
        let message = format!("{}: {}", entry.title, entry.link);

        info!("Sending to Gotify: {}", title);
        let response = self
            .client
            .post(format!("{}/message", settings.url.trim_end_matches('/')))
            .query(&[("token", settings.token.as_str())])
            .form(&[("title", title.as_str()), ("message", message.as_str())])
            .send()
            .await
            .context("gotify request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("gotify answered {}", status);
        }
        Ok(())
    }
}
