use crate::provider::TranslationProvider;
use std::sync::Arc;
use tracing::warn;

/// Source hint used when detection fails; providers accept it as "detect for me".
pub const AUTO: &str = "auto";

/// Resolves the source language of inbound text.
#[derive(Clone)]
pub struct LanguageDetector {
    provider: Arc<dyn TranslationProvider>,
}

impl LanguageDetector {
    pub fn new(provider: Arc<dyn TranslationProvider>) -> Self {
        Self { provider }
    }

    /// Detect the language of `text` as a lower-case code.
    ///
    /// Never fails: any provider or worker error degrades to [`AUTO`].
    pub async fn detect(&self, text: &str) -> String {
        let provider = Arc::clone(&self.provider);
        let owned = text.to_string();

        match tokio::task::spawn_blocking(move || provider.detect_language(&owned)).await {
            Ok(Ok(code)) => code.to_lowercase(),
            Ok(Err(e)) => {
                warn!("Language detection failed, using '{}': {}", AUTO, e);
                AUTO.to_string()
            }
            Err(e) => {
                warn!("Language detection worker failed, using '{}': {}", AUTO, e);
                AUTO.to_string()
            }
        }
    }
}
