//! Translation provider boundary.
//!
//! Providers are blocking: callers run them on the blocking worker pool
//! (`tokio::task::spawn_blocking`) so one slow request never stalls other
//! chats.

use anyhow::Context;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to reach translation service: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Translation service error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed translation response: {0}")]
    Malformed(String),
}

/// An opaque detect-and-translate service.
pub trait TranslationProvider: Send + Sync + 'static {
    /// Detect the language of `text`, returning the provider's code.
    fn detect_language(&self, text: &str) -> Result<String, ProviderError>;

    /// Translate `text` from `source` (a code, or `"auto"`) into `target`.
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError>;
}

/// Google's public translate endpoint (`client=gtx`).
pub struct GoogleTranslator {
    client: reqwest::blocking::Client,
    api_url: String,
}

/// Parsed body of a `translate_a/single` response.
#[derive(Debug, PartialEq)]
struct GoogleResponse {
    translation: String,
    detected_source: Option<String>,
}

impl GoogleTranslator {
    /// Create a translator against `api_url`. `timeout` of `None` waits
    /// indefinitely.
    pub fn new(api_url: &str, timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    /// Build on the blocking pool. The blocking client must not be created
    /// or used on an async worker thread.
    pub async fn build(api_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let api_url = api_url.to_string();
        let translator = tokio::task::spawn_blocking(move || Self::new(&api_url, timeout))
            .await
            .context("Translation client worker failed")?
            .context("Failed to build translation client")?;
        Ok(translator)
    }

    fn request(&self, text: &str, source: &str, target: &str) -> Result<GoogleResponse, ProviderError> {
        debug!("Provider request {} -> {} ({} chars)", source, target, text.len());

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.text()?;
        parse_response(&body)
    }
}

impl TranslationProvider for GoogleTranslator {
    fn detect_language(&self, text: &str) -> Result<String, ProviderError> {
        self.request(text, "auto", "en")?
            .detected_source
            .ok_or_else(|| ProviderError::Malformed("missing detected language".to_string()))
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError> {
        Ok(self.request(text, source, target)?.translation)
    }
}

/// Google returns `[[["<translated>", "<original>", ...], ...], null, "<src>", ...]`.
/// Long texts are split into several segments that must be concatenated.
fn parse_response(body: &str) -> Result<GoogleResponse, ProviderError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON: {}", e)))?;

    let segments = json
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::Malformed("missing segment array".to_string()))?;

    let translation: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
        .collect();

    if translation.is_empty() {
        return Err(ProviderError::Malformed("empty translation".to_string()));
    }

    let detected_source = json
        .get(2)
        .and_then(|v| v.as_str())
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    Ok(GoogleResponse {
        translation,
        detected_source,
    })
}
