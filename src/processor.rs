use crate::classifier::{classify, ClassificationResult};
use crate::extractor::{extract_score, header_section};
use crate::learner::{observe, LearnedHeaderSet};
use crate::sink::PresentationSink;
use crate::store::{ConfigSnapshot, ConfigStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Runs classification and header learning for displayed messages.
///
/// Each call works on its own configuration snapshot, so any number of
/// messages can be processed at once. Headers learned during the session are
/// remembered here as well, so a store that cannot be written does not make
/// the same header show up as new on every message.
pub struct MessageProcessor<S, P> {
    store: Arc<S>,
    sink: Arc<P>,
    session_learned: Arc<RwLock<LearnedHeaderSet>>,
}

impl<S, P> Clone for MessageProcessor<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sink: self.sink.clone(),
            session_learned: self.session_learned.clone(),
        }
    }
}

impl<S: ConfigStore, P: PresentationSink> MessageProcessor<S, P> {
    pub fn new(store: Arc<S>, sink: Arc<P>) -> Self {
        Self {
            store,
            sink,
            session_learned: Arc::new(RwLock::new(LearnedHeaderSet::new())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Pushes the stored bounds, learned headers and display toggles to the
    /// sink. Called once at startup.
    pub async fn init(&self) -> ConfigSnapshot {
        let snapshot = self.snapshot().await;
        {
            let mut session = self.session_learned.write().await;
            for name in snapshot.learned_headers.iter() {
                session.insert(name);
            }
        }

        if let Err(e) = self.sink.set_score_bounds(snapshot.bounds).await {
            log::warn!("Failed to set score bounds: {e}");
        }
        if !snapshot.learned_headers.is_empty() {
            let names = snapshot.learned_headers.to_vec();
            if let Err(e) = self.sink.register_dynamic_headers(&names).await {
                log::warn!("Failed to register learned headers: {e}");
            }
        }
        if let Err(e) = self.sink.set_display_toggles(snapshot.toggles).await {
            log::warn!("Failed to set display toggles: {e}");
        }

        log::info!(
            "Initialized with bounds {} .. {} and {} learned header(s)",
            snapshot.bounds.lower,
            snapshot.bounds.upper,
            snapshot.learned_headers.len()
        );
        snapshot
    }

    /// Handles one displayed message. Returns what was shown, or `None` when
    /// the display was suppressed.
    pub async fn process_message(
        &self,
        message_id: &str,
        raw_message: &str,
    ) -> Option<ClassificationResult> {
        let headers = header_section(raw_message);
        let snapshot = self.snapshot().await;

        let result = classify_headers(headers, &snapshot);
        let shown = match &result {
            Some(result) => self.sink.show(message_id, result).await,
            None => self.sink.suppress(message_id).await,
        };
        if let Err(e) = shown {
            log::warn!("{message_id}: failed to update display: {e}");
        }

        self.learn(message_id, headers, &snapshot).await;
        result
    }

    async fn snapshot(&self) -> ConfigSnapshot {
        match self.store.load().await {
            Ok(config) => config.snapshot(),
            Err(e) => {
                log::warn!("Configuration unavailable, classifying everything neutral: {e}");
                ConfigSnapshot::unavailable()
            }
        }
    }

    async fn learn(&self, message_id: &str, headers: &str, snapshot: &ConfigSnapshot) {
        let Some(name) = observe(headers, &snapshot.learned_headers) else {
            return;
        };
        if !self.session_learned.write().await.insert(&name) {
            log::debug!("{message_id}: {name} already learned this session");
            return;
        }

        match self.store.append_learned_header(&name).await {
            Ok(true) => log::info!("{message_id}: learned MailScanner header {name}"),
            // Another message got there first
            Ok(false) => log::debug!("{message_id}: {name} already stored"),
            Err(e) => {
                log::warn!("{message_id}: failed to store learned header {name}: {e}");
            }
        }

        if let Err(e) = self.sink.register_dynamic_headers(&[name]).await {
            log::warn!("{message_id}: failed to register header: {e}");
        }
    }
}

/// Score and verdict for a header blob under the given configuration.
pub fn classify_headers(headers: &str, snapshot: &ConfigSnapshot) -> Option<ClassificationResult> {
    let score = extract_score(headers)?;
    let verdict = classify(score.value, &snapshot.bounds);
    let hidden = snapshot.toggles.hides(verdict);
    Some(ClassificationResult::new(score, verdict, hidden))
}
