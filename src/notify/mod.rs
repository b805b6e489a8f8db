//! Operator notifications
//!
//! Flows report progress and failures through a [`Notifier`]: a severity,
//! a message, nothing else. Delivery problems are logged and swallowed so
//! a broken notification channel can never fail a sync.
//!
//! The concrete sink is chosen by `NOTIFY_OUTPUT`: stdout (tracing-backed),
//! Telegram, both, or none.

pub mod stdout;
pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::{NotifyConfig, NotifyOutput};
use crate::domain::Result;

pub use stdout::StdoutNotifier;
pub use telegram::TelegramNotifier;

/// Severity-tagged message sink.
///
/// Implementations must not return errors; a sink that cannot deliver logs
/// the problem itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn info(&self, message: &str);
    async fn warning(&self, message: &str);
    async fn error(&self, message: &str);
    async fn success(&self, message: &str);
}

/// Builds the configured notifier.
///
/// # Errors
///
/// Returns an error when the Telegram HTTP client cannot be constructed.
pub fn build_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    match config.output {
        NotifyOutput::Stdout => Ok(Arc::new(StdoutNotifier)),
        NotifyOutput::Telegram => Ok(Arc::new(TelegramNotifier::from_config(config)?)),
        NotifyOutput::Multi => {
            let telegram = TelegramNotifier::from_config(config)?;
            Ok(Arc::new(MultiNotifier::new(vec![
                Arc::new(StdoutNotifier),
                Arc::new(telegram),
            ])))
        }
        NotifyOutput::None => Ok(Arc::new(NoopNotifier)),
    }
}

/// Fans every message out to all wrapped sinks concurrently.
pub struct MultiNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn info(&self, message: &str) {
        join_all(self.sinks.iter().map(|sink| sink.info(message))).await;
    }

    async fn warning(&self, message: &str) {
        join_all(self.sinks.iter().map(|sink| sink.warning(message))).await;
    }

    async fn error(&self, message: &str) {
        join_all(self.sinks.iter().map(|sink| sink.error(message))).await;
    }

    async fn success(&self, message: &str) {
        join_all(self.sinks.iter().map(|sink| sink.success(message))).await;
    }
}

/// Discards every message.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn info(&self, _message: &str) {}
    async fn warning(&self, _message: &str) {}
    async fn error(&self, _message: &str) {}
    async fn success(&self, _message: &str) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::Notifier;

    /// Test sink that records every delivered message with its severity.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        pub fn record(&self, level: &str, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push((level.to_string(), message.to_string()));
        }

        pub fn messages(&self, level: &str) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn info(&self, message: &str) {
            self.record("info", message);
        }

        async fn warning(&self, message: &str) {
            self.record("warning", message);
        }

        async fn error(&self, message: &str) {
            self.record("error", message);
        }

        async fn success(&self, message: &str) {
            self.record("success", message);
        }
    }
}
