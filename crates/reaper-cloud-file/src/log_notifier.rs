//! Notifier that only writes to the log

use async_trait::async_trait;
use reaper_cloud_api::{Notifier, NotifyResult};
use tracing::info;

/// Used when no chat backend is configured or its token is missing
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_channel(&self, text: &str) -> NotifyResult<()> {
        info!(target: "reaper::channel", "{}", text);
        Ok(())
    }

    async fn send_direct(&self, email: &str, text: &str) -> NotifyResult<()> {
        info!(target: "reaper::direct", email, "{}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier::new();
        assert!(notifier.send_channel("hello").await.is_ok());
        assert!(notifier.send_direct("a@x.io", "hi").await.is_ok());
    }
}
