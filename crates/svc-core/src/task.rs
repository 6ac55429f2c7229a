//! The recurring work the installed service performs.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::{install_dir_of, ServiceConfig};

/// Appends a timestamped "Hello World" line to a log file on a fixed interval.
pub struct HelloTask {
    log_path: PathBuf,
    interval: Duration,
}

impl HelloTask {
    pub fn new(log_path: PathBuf, interval: Duration) -> Self {
        Self { log_path, interval }
    }

    /// Task for a service binary at `executable`: the log goes into the
    /// install directory, or next to the binary if it is not installed.
    pub fn for_executable(config: &ServiceConfig, executable: &Path) -> Self {
        let base = install_dir_of(executable)
            .or_else(|| executable.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Self::new(
            base.join(&config.log_file_name),
            Duration::from_secs(config.interval_secs),
        )
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Append one line to the log file.
    pub async fn write_once(&self) -> Result<()> {
        let line = format!("Hello World {}\n", chrono::Local::now().to_rfc3339());
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .with_context(|| format!("failed to open {}", self.log_path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", self.log_path.display()))?;
        file.flush().await?;
        Ok(())
    }

    /// Write immediately and then once per interval until `shutdown`
    /// resolves. Write failures are logged and do not stop the loop.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "writing to {} every {}s",
            self.log_path.display(),
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.write_once().await {
                        warn!("write failed: {:#}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping task");
                    break;
                }
            }
        }
    }
}
