//! Log-backed notification sink

use async_trait::async_trait;

use super::Notifier;

/// Routes notifications into the tracing pipeline.
///
/// Success is a distinct severity on the operator channel but maps to
/// `info` here, tagged so log filters can tell the two apart.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    async fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    async fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    async fn success(&self, message: &str) {
        tracing::info!(status = "success", "{message}");
    }
}
