//! Language registry: the fixed set of translation targets.
//!
//! Chats may only select a target language listed here. The registry is a
//! lazily built singleton so lookups never allocate after first use.

use std::sync::OnceLock;

/// Metadata for one supported target language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Lower-case language code as the translation provider spells it
    /// (e.g., "en", "zh-cn")
    pub code: &'static str,

    /// English display name (e.g., "Chinese (Simplified)")
    pub name: &'static str,

    /// Whether chats without a stored preference translate into this language
    pub is_default: bool,
}

/// Registry of every supported target language, in display order.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: SUPPORTED
                .iter()
                .map(|&(code, name)| LanguageConfig {
                    code,
                    name,
                    is_default: code == DEFAULT_CODE,
                })
                .collect(),
        })
    }

    /// Look up a language by its exact code.
    ///
    /// Matching is case-sensitive; callers normalise user input first.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// All supported languages in display order.
    pub fn list_all(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// The language used when a chat has no stored target.
    pub fn default_language(&self) -> &LanguageConfig {
        self.languages
            .iter()
            .find(|lang| lang.is_default)
            .unwrap_or(&self.languages[0])
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }
}

const DEFAULT_CODE: &str = "en";

const SUPPORTED: [(&str, &str); 30] = [
    ("en", "English"),
    ("ru", "Russian"),
    ("hi", "Hindi"),
    ("bn", "Bengali"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("tr", "Turkish"),
    ("ar", "Arabic"),
    ("ur", "Urdu"),
    ("fa", "Persian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh-cn", "Chinese (Simplified)"),
    ("zh-tw", "Chinese (Traditional)"),
    ("vi", "Vietnamese"),
    ("th", "Thai"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("uk", "Ukrainian"),
    ("ro", "Romanian"),
    ("el", "Greek"),
    ("sv", "Swedish"),
    ("no", "Norwegian"),
    ("fi", "Finnish"),
    ("he", "Hebrew"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_registry_has_thirty_languages() {
        assert_eq!(LanguageRegistry::get().list_all().len(), 30);
    }

    #[test]
    fn test_codes_are_unique() {
        let all = LanguageRegistry::get().list_all();
        let mut codes: Vec<_> = all.iter().map(|l| l.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_codes_are_lowercase() {
        for lang in LanguageRegistry::get().list_all() {
            assert_eq!(lang.code, lang.code.to_lowercase(), "{}", lang.code);
        }
    }

    #[test]
    fn test_get_by_code_chinese_simplified() {
        let config = LanguageRegistry::get()
            .get_by_code("zh-cn")
            .expect("zh-cn should be supported");
        assert_eq!(config.name, "Chinese (Simplified)");
        assert!(!config.is_default);
    }

    #[test]
    fn test_get_by_code_is_case_sensitive() {
        assert!(LanguageRegistry::get().get_by_code("zh-CN").is_none());
        assert!(LanguageRegistry::get().get_by_code("EN").is_none());
    }

    #[test]
    fn test_unsupported_codes() {
        let registry = LanguageRegistry::get();
        assert!(!registry.is_supported("xx"));
        assert!(!registry.is_supported("auto"));
        assert!(!registry.is_supported(""));
    }

    #[test]
    fn test_default_language_is_english() {
        let default = LanguageRegistry::get().default_language();
        assert_eq!(default.code, "en");
        assert!(default.is_default);
    }

    #[test]
    fn test_exactly_one_default() {
        let defaults = LanguageRegistry::get()
            .list_all()
            .iter()
            .filter(|l| l.is_default)
            .count();
        assert_eq!(defaults, 1);
    }
}
