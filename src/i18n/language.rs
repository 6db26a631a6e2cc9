//! Language type: a target language validated against the registry.
//!
//! A `Language` can only be built from a supported code, which is how the
//! store guarantees that no unsupported target is ever persisted.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use thiserror::Error;

/// Returned when a code is not one of the supported target languages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language code: '{0}'")]
pub struct UnsupportedLanguage(pub String);

/// A validated target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };
    pub const SPANISH: Language = Language { code: "es" };
    pub const FRENCH: Language = Language { code: "fr" };

    /// Create a Language from an exact, lower-case code.
    ///
    /// # Example
    /// ```ignore
    /// let simplified = Language::from_code("zh-cn")?;
    /// ```
    pub fn from_code(code: &str) -> Result<Language, UnsupportedLanguage> {
        LanguageRegistry::get()
            .get_by_code(code)
            .map(|config| Language { code: config.code })
            .ok_or_else(|| UnsupportedLanguage(code.to_string()))
    }

    /// The target used for chats that never chose one.
    pub fn default_target() -> Language {
        Language {
            code: LanguageRegistry::get().default_language().code,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is missing from the registry, which cannot happen
    /// for a Language built through `from_code` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    /// English display name (e.g., "French").
    pub fn name(&self) -> &'static str {
        self.config().name
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::default_target()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code)
    }
}
