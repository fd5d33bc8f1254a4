use anyhow::Result;
#[cfg(feature = "webhook")]
pub mod webhook;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use wxwatch_core::{AlertEvent, Notifier};

/// Writes alerts to the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        tracing::warn!(%recipient, %subject, "{}", body);
        Ok(())
    }
}

#[derive(Serialize)]
struct AlertLine<'a> {
    sent_at: i64,
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Appends each alert as one JSON line to `alerts.jsonl`
pub struct FsNotifier {
    file: PathBuf,
    // serialises appends from concurrent sweep tasks
    write_lock: Mutex<()>,
}

impl FsNotifier {
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir).await?;
        let file = dir.join("alerts.jsonl");
        Ok(Self {
            file,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

#[async_trait::async_trait]
impl Notifier for FsNotifier {
    fn name(&self) -> &str {
        "fs"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let mut line = serde_json::to_vec(&AlertLine {
            sent_at: chrono::Utc::now().timestamp(),
            recipient,
            subject,
            body,
        })?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .await?;
        f.write_all(&line).await?;
        f.flush().await?;
        Ok(())
    }
}

/// Sends alert events through a notifier, best effort
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    recipient: String,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, recipient: impl Into<String>) -> Self {
        Self {
            notifier,
            recipient: recipient.into(),
        }
    }

    /// Deliver one alert; failures are logged and reported as `false`
    pub async fn dispatch(&self, event: &AlertEvent) -> bool {
        match self
            .notifier
            .send(&self.recipient, &event.subject(), &event.message)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    location = %event.location,
                    notifier = self.notifier.name(),
                    "Alert sent"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    location = %event.location,
                    notifier = self.notifier.name(),
                    error = ?e,
                    "Error sending alert"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenNotifier;

    #[async_trait::async_trait]
    impl Notifier for BrokenNotifier {
        fn name(&self) -> &str {
            "broken"
        }

        async fn send(&self, _: &str, _: &str, _: &str) -> Result<()> {
            anyhow::bail!("smtp unreachable")
        }
    }

    fn event() -> AlertEvent {
        AlertEvent {
            location: "Hyderabad".into(),
            message: "Alert! hot".into(),
            triggering_temperature: 33.0,
            threshold: 30.0,
        }
    }

    #[tokio::test]
    async fn writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(FsNotifier::new(dir.path()).await.unwrap());
        let dispatcher = AlertDispatcher::new(notifier.clone(), "ops@example.com");

        assert!(dispatcher.dispatch(&event()).await);
        assert!(dispatcher.dispatch(&event()).await);

        let content = std::fs::read_to_string(notifier.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["recipient"], "ops@example.com");
        assert_eq!(first["subject"], "Weather Alert for Hyderabad");
        assert_eq!(first["body"], "Alert! hot");
    }

    #[tokio::test]
    async fn failed_send_is_swallowed() {
        let dispatcher = AlertDispatcher::new(Arc::new(BrokenNotifier), "ops@example.com");
        assert!(!dispatcher.dispatch(&event()).await);
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let dispatcher = AlertDispatcher::new(Arc::new(LogNotifier), "ops@example.com");
        assert!(dispatcher.dispatch(&event()).await);
    }
}
