//! Schema file watcher
//!
//! Polls a schema file and hands every new version of its content to a sink
//! (normally [`Session::edit_schema`](crate::Session::edit_schema)). Saving
//! the file in an external editor then behaves like typing in the schema
//! editor: bursts of saves are coalesced by the pipeline's debounce.

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::Result;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls one file for content changes
pub struct SchemaWatcher {
    path: PathBuf,
    poll_interval: Duration,
    last_content: Option<String>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SchemaWatcher {
    pub fn new(path: impl Into<PathBuf>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_content: None,
            shutdown_rx,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Treat `content` as already seen, so it is not reported again
    pub fn with_initial_content(mut self, content: impl Into<String>) -> Self {
        self.last_content = Some(content.into());
        self
    }

    /// Run the watcher loop until shutdown is signalled.
    ///
    /// Read errors are logged and retried on the next poll; a sink error ends
    /// the loop.
    pub async fn run<F>(&mut self, mut sink: F) -> Result<()>
    where
        F: FnMut(String) -> Result<()>,
    {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {
                    match self.check_for_changes().await {
                        Ok(Some(content)) => sink(content)?,
                        Ok(None) => {}
                        Err(e) => tracing::warn!(path = %self.path.display(), "Error reading schema file: {}", e),
                    }
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        tracing::debug!("Schema watcher shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn check_for_changes(&mut self) -> Result<Option<String>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        if self.last_content.as_deref() == Some(content.as_str()) {
            return Ok(None);
        }

        tracing::info!(path = %self.path.display(), "Schema file changed");
        self.last_content = Some(content.clone());
        Ok(Some(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_reports_changes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        std::fs::write(&path, "CREATE TABLE a (x);").unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut watcher = SchemaWatcher::new(&path, shutdown_rx)
            .with_poll_interval(Duration::from_millis(10))
            .with_initial_content("CREATE TABLE a (x);");
        let sink_seen = seen.clone();
        let task = tokio::spawn(async move {
            watcher
                .run(move |content| {
                    sink_seen.lock().unwrap().push(content);
                    Ok(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, "CREATE TABLE b (y);").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["CREATE TABLE b (y);".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut watcher = SchemaWatcher::new(dir.path().join("missing.sql"), shutdown_rx)
            .with_poll_interval(Duration::from_millis(5));

        let task = tokio::spawn(async move { watcher.run(|_| Ok(())).await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();
        assert!(task.await.unwrap().is_ok());
    }
}
