use crate::types::{Entry, Notifier};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Serialize)]
struct Payload<'a> {
    feed: &'a str,
    entry: &'a Entry,
    config: serde_json::Value,
}

/// Runs an external program per notification.
///
/// The program gets the feed name as its only argument and a JSON document
/// `{"feed", "entry", "config"}` on stdin. Exit status 0 means delivered;
/// anything else is reported along with the program's stderr.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: PathBuf,
}

impl CommandNotifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, entry: &Entry, feed_name: &str, config: &str) -> Result<()> {
        let config = serde_json::from_str(config)
            .unwrap_or_else(|_| serde_json::Value::String(config.to_string()));
        let payload = serde_json::to_vec(&Payload {
            feed: feed_name,
            entry,
            config,
        })?;

        debug!("Running {} for {}", self.program.display(), feed_name);
        let mut child = Command::new(&self.program)
            .arg(feed_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // A timed-out dispatch drops this future; take the process with it.
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("cannot start {}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            // Programs may exit without reading stdin; their exit status decides.
            if let Err(e) = stdin.write_all(&payload).await {
                debug!("{} closed stdin early: {}", self.program.display(), e);
            }
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program.display(), output.status, stderr.trim());
        }
        Ok(())
    }
}
