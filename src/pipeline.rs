//! Per-message translation dispatch.
//!
//! Gates run in order and the first failing one ends the message:
//! payload → chat policy → user policy → admission → word check →
//! detection → same-language check → cached translation → reply.

use crate::cache::TranslationCache;
use crate::db::Database;
use crate::detect::LanguageDetector;
use crate::rate_limit::{RateKey, RateLimiter};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

/// A chat message as the pipeline sees it, independent of transport.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub chat_id: i64,
    /// Absent for anonymous senders such as channel posts
    pub user_id: Option<i64>,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl InboundMessage {
    /// The text to translate: the message text, or the media caption when the
    /// text is missing or empty.
    pub fn payload(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.caption.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No sender or no text/caption
    NoContent,
    ChatDisabled,
    UserDisabled,
    RateLimited,
    /// Only punctuation, whitespace or emoji
    NoWordCharacters,
    /// Detected source equals the chat's target
    SameLanguage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Dropped(DropReason),
    /// An error was logged; nothing is sent
    Failed,
}

pub struct Dispatcher {
    db: Database,
    limiter: Arc<RateLimiter>,
    detector: LanguageDetector,
    cache: Arc<TranslationCache>,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        limiter: Arc<RateLimiter>,
        detector: LanguageDetector,
        cache: Arc<TranslationCache>,
    ) -> Self {
        Self {
            db,
            limiter,
            detector,
            cache,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Decide what to do with one message and run the translation if needed.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`Outcome::Failed`].
    pub async fn process(&self, message: &InboundMessage) -> Outcome {
        let (Some(user_id), Some(text)) = (message.user_id, message.payload()) else {
            return Outcome::Dropped(DropReason::NoContent);
        };
        let chat_id = message.chat_id;

        let chat = match self.db.get_chat_policy(chat_id).await {
            Ok(policy) => policy,
            Err(e) => {
                error!("Failed to load chat policy for {}: {}", chat_id, e);
                return Outcome::Failed;
            }
        };
        if !chat.enabled {
            debug!("Translation disabled in chat {}", chat_id);
            return Outcome::Dropped(DropReason::ChatDisabled);
        }

        match self.db.get_user_policy(user_id).await {
            Ok(user) if !user.enabled => {
                debug!("Translation disabled for user {}", user_id);
                return Outcome::Dropped(DropReason::UserDisabled);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to load user policy for {}: {}", user_id, e);
                return Outcome::Failed;
            }
        }

        if !self.limiter.allow(RateKey::new(chat_id, user_id)) {
            debug!("Rate limited {}:{}", chat_id, user_id);
            return Outcome::Dropped(DropReason::RateLimited);
        }

        if !has_word_character(text) {
            return Outcome::Dropped(DropReason::NoWordCharacters);
        }

        let src = self.detector.detect(text).await;
        let dst = chat.target_language;
        if src == dst.code() {
            return Outcome::Dropped(DropReason::SameLanguage);
        }

        match self.cache.translate(text, &src, dst.code()).await {
            Ok(translated) => {
                info!("Translated message in chat {} ({} -> {})", chat_id, src, dst);
                Outcome::Reply(format_reply(&src, dst.code(), &translated))
            }
            Err(e) => {
                error!(
                    "Translation failed in chat {} ({} -> {}): {}",
                    chat_id, src, dst, e
                );
                Outcome::Failed
            }
        }
    }
}

/// True if `text` contains at least one Unicode word character.
pub fn has_word_character(text: &str) -> bool {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w").expect("valid regex"))
        .is_match(text)
}

pub fn format_reply(src: &str, dst: &str, translated: &str) -> String {
    format!(
        "🌐 {} → {}\n{}",
        src.to_uppercase(),
        dst.to_uppercase(),
        translated
    )
}
