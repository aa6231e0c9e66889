//! Append-only request log.
//!
//! Every event becomes one `[DD/MM/YYYY, HH:MM:SS] message` line, stamped in
//! Dubai local time. Writes are detached from the request that produced them:
//! a failed write is reported through `tracing` and otherwise ignored.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use chrono_tz::{Asia::Dubai, Tz};
use tokio::{fs, io::AsyncWriteExt};

pub const LOG_TIMEZONE: Tz = Dubai;

#[derive(Debug, Clone)]
pub struct SleepLog {
    path: Arc<PathBuf>,
}

impl SleepLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SleepLog {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp `message` now and append it in the background.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn record(&self, message: impl AsRef<str>) {
        let line = format_entry(Utc::now(), message.as_ref());
        let log = self.clone();
        tokio::spawn(async move {
            if let Err(err) = log.append(&line).await {
                tracing::error!(path = %log.path.display(), "❌ Error writing log: {err}");
            }
        });
    }

    /// Append an already formatted line, creating the log directory first.
    pub async fn append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // one write per line so concurrent appends don't interleave
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

pub fn format_entry(now: DateTime<Utc>, message: &str) -> String {
    let local = now.with_timezone(&LOG_TIMEZONE);
    format!("[{}] {message}\n", local.format("%d/%m/%Y, %H:%M:%S"))
}
