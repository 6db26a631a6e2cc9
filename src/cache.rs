//! Bounded LRU memoization of provider translations.
//! Key: (text, source code, target code). Entries never change once stored.

use crate::metrics::{CacheMetrics, MetricsReport};
use crate::provider::{ProviderError, TranslationProvider};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 5000;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Translation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    source: String,
    target: String,
}

pub struct TranslationCache {
    provider: Arc<dyn TranslationProvider>,
    entries: Mutex<LruCache<CacheKey, String>>,
    metrics: CacheMetrics,
}

impl TranslationCache {
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(provider: Arc<dyn TranslationProvider>, capacity: usize) -> Self {
        Self {
            provider,
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be > 0"),
            )),
            metrics: CacheMetrics::default(),
        }
    }

    /// Translate through the cache.
    ///
    /// Misses call the provider on the blocking pool. Failures are returned
    /// without being stored, so the next call for the same key retries.
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let key = CacheKey {
            text: text.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        };

        let cached = self.entries.lock().get(&key).cloned();
        if let Some(hit) = cached {
            self.metrics.record_cache_hit();
            debug!("Translation cache hit ({} -> {})", source, target);
            return Ok(hit);
        }
        self.metrics.record_cache_miss();

        let provider = Arc::clone(&self.provider);
        let (text, src, dst) = (key.text.clone(), key.source.clone(), key.target.clone());

        self.metrics.record_provider_call();
        let result = tokio::task::spawn_blocking(move || provider.translate(&text, &src, &dst)).await;

        let translated = match result {
            Ok(Ok(translated)) => translated,
            Ok(Err(e)) => {
                self.metrics.record_provider_failure();
                return Err(e.into());
            }
            Err(e) => {
                self.metrics.record_provider_failure();
                return Err(e.into());
            }
        };

        self.entries.lock().put(key, translated.clone());
        Ok(translated)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, text: &str, source: &str, target: &str) -> bool {
        let key = CacheKey {
            text: text.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        };
        self.entries.lock().contains(&key)
    }

    pub fn report(&self) -> MetricsReport {
        self.metrics.report(self.len())
    }
}
