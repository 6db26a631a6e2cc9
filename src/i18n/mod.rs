//! Supported target languages.
//!
//! - `registry`: single source of truth for the 30 selectable languages
//! - `language`: type-safe `Language` that can only hold a supported code
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::{Language, LanguageRegistry};
//!
//! let french = Language::from_code("fr")?;
//! let all = LanguageRegistry::get().list_all();
//! ```

mod language;
mod registry;

pub use language::{Language, UnsupportedLanguage};
pub use registry::{LanguageConfig, LanguageRegistry};
