use crate::classifier::{Bounds, ClassificationResult};
use crate::store::DisplayToggles;
use std::future::Future;

/// Where classification results end up: a mail client's message toolbar,
/// a message list column, or just the log.
pub trait PresentationSink: Send + Sync {
    fn show(
        &self,
        message_id: &str,
        result: &ClassificationResult,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// No score was found for this message.
    fn suppress(&self, message_id: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Ask the host's own header matcher to start treating these names as
    /// score sources. Registering a name twice must be harmless.
    fn register_dynamic_headers(
        &self,
        names: &[String],
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn set_score_bounds(&self, _bounds: Bounds) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }

    fn set_display_toggles(
        &self,
        _toggles: DisplayToggles,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PresentationSink for LogSink {
    async fn show(&self, message_id: &str, result: &ClassificationResult) -> anyhow::Result<()> {
        log::info!(
            "{}: {} ({}{})",
            message_id,
            result.tooltip,
            result.verdict,
            if result.icon_hidden { ", icon hidden" } else { "" }
        );
        Ok(())
    }

    async fn suppress(&self, message_id: &str) -> anyhow::Result<()> {
        log::info!("{}: no spam score", message_id);
        Ok(())
    }

    async fn register_dynamic_headers(&self, names: &[String]) -> anyhow::Result<()> {
        if !names.is_empty() {
            log::info!("Recognizing MailScanner headers: {}", names.join(", "));
        }
        Ok(())
    }

    async fn set_score_bounds(&self, bounds: Bounds) -> anyhow::Result<()> {
        log::debug!("Score bounds: {} .. {}", bounds.lower, bounds.upper);
        Ok(())
    }
}
