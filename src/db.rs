use crate::i18n::{Language, UnsupportedLanguage};
use anyhow::Context;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid language code: '{0}'")]
    InvalidLanguageCode(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UnsupportedLanguage> for PolicyError {
    fn from(err: UnsupportedLanguage) -> Self {
        PolicyError::InvalidLanguageCode(err.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPolicy {
    pub chat_id: i64,
    pub enabled: bool,
    pub target_language: Language,
}

impl ChatPolicy {
    fn default_for(chat_id: i64) -> Self {
        Self {
            chat_id,
            enabled: true,
            target_language: Language::default_target(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPolicy {
    pub user_id: i64,
    pub enabled: bool,
}

/// Durable per-chat and per-user translation settings.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect using a `sqlite:` URL and create tables
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context(format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);
        Self::with_options(options).await
    }

    /// Open (or create) a database file at `path`
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::with_options(options).await
    }

    async fn with_options(options: SqliteConnectOptions) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open settings database")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_settings (
                chat_id INTEGER PRIMARY KEY,
                enabled INTEGER NOT NULL DEFAULT 1,
                target_lang TEXT NOT NULL DEFAULT 'en',
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create chat_settings table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_settings (
                user_id INTEGER PRIMARY KEY,
                enabled INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create user_settings table")?;

        Ok(Self { pool })
    }

    /// Get a chat's policy, falling back to defaults when no row exists
    pub async fn get_chat_policy(&self, chat_id: i64) -> Result<ChatPolicy, PolicyError> {
        let row: Option<(bool, String)> = sqlx::query_as(
            "SELECT enabled, target_lang FROM chat_settings WHERE chat_id = ?1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((enabled, code)) = row else {
            return Ok(ChatPolicy::default_for(chat_id));
        };

        let target_language = Language::from_code(&code).unwrap_or_else(|e| {
            warn!("Chat {} has {}; using default target", chat_id, e);
            Language::default_target()
        });

        Ok(ChatPolicy {
            chat_id,
            enabled,
            target_language,
        })
    }

    pub async fn get_user_policy(&self, user_id: i64) -> Result<UserPolicy, PolicyError> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT enabled FROM user_settings WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(UserPolicy {
            user_id,
            enabled: enabled.unwrap_or(true),
        })
    }

    /// Enable or disable translation in a chat, keeping its target language
    pub async fn set_chat_enabled(&self, chat_id: i64, enabled: bool) -> Result<(), PolicyError> {
        sqlx::query(
            "INSERT INTO chat_settings (chat_id, enabled, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at",
        )
        .bind(chat_id)
        .bind(enabled)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_user_enabled(&self, user_id: i64, enabled: bool) -> Result<(), PolicyError> {
        sqlx::query(
            "INSERT INTO user_settings (user_id, enabled, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(enabled)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set a chat's target language, keeping its enabled flag.
    ///
    /// Unsupported codes are rejected before the database is touched.
    pub async fn set_chat_target(&self, chat_id: i64, code: &str) -> Result<Language, PolicyError> {
        let language = Language::from_code(code)?;

        sqlx::query(
            "INSERT INTO chat_settings (chat_id, target_lang, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET
                target_lang = excluded.target_lang,
                updated_at = excluded.updated_at",
        )
        .bind(chat_id)
        .bind(language.code())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(language)
    }

    #[cfg(test)]
    async fn chat_row_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM chat_settings")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
