//! Hand-off of accepted offers to the user.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Result;
use crate::models::NotifyConfig;

/// Receives one call per accepted offer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, site: &str, id: &str, url: &str) -> Result<()>;
}

/// Opens the detail URL with an external viewer (a browser by default).
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, site: &str, id: &str, url: &str) -> Result<()> {
        log::info!("{}: opening {} ({})", site, id, url);
        // The viewer outlives us; it is not awaited.
        Command::new(&self.program)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

/// Only logs accepted offers.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, site: &str, id: &str, url: &str) -> Result<()> {
        log::info!("{}: accepted offer {}: {}", site, id, url);
        Ok(())
    }
}

/// Notifier matching the configuration.
pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    if config.enabled {
        Arc::new(CommandNotifier::new(&config.command))
    } else {
        Arc::new(LogNotifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        assert!(LogNotifier.notify("pap", "1", "https://example.com/1").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_viewer_is_an_error() {
        let notifier = CommandNotifier::new("/nonexistent/flatwatch-viewer");
        let err = notifier
            .notify("pap", "1", "https://example.com/1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
