use anyhow::{bail, Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_webhook_secret: String,
    pub telegram_api_url: String,
    pub webhook_url: Option<String>,

    // Translation provider
    pub translate_api_url: String,
    pub provider_timeout: Option<Duration>,

    // Persistence
    pub database_url: String,

    // Admission control and caching
    pub rate_limit_window: Duration,
    pub cache_capacity: usize,
    pub rate_limit_sweep_cron: Option<String>,

    // Server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let cache_capacity = parse_env("CACHE_CAPACITY", 5000usize)?;
        if cache_capacity == 0 {
            bail!("CACHE_CAPACITY must be greater than 0");
        }

        Ok(Self {
            // Telegram
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .context("TELEGRAM_BOT_TOKEN not set")?,
            telegram_webhook_secret: std::env::var("TELEGRAM_WEBHOOK_SECRET")
                .context("TELEGRAM_WEBHOOK_SECRET not set")?,
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            webhook_url: optional_env("WEBHOOK_URL"),

            // Translation provider
            translate_api_url: std::env::var("TRANSLATE_API_URL").unwrap_or_else(|_| {
                "https://translate.googleapis.com/translate_a/single".to_string()
            }),
            provider_timeout: optional_env("PROVIDER_TIMEOUT_SECS")
                .map(|v| {
                    v.parse::<u64>()
                        .map(Duration::from_secs)
                        .context(format!("Invalid PROVIDER_TIMEOUT_SECS: '{}'", v))
                })
                .transpose()?,

            // Persistence
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://settings.db?mode=rwc".to_string()),

            // Admission control and caching
            rate_limit_window: Duration::from_secs(parse_env("RATE_LIMIT_SECONDS", 2u64)?),
            cache_capacity,
            rate_limit_sweep_cron: optional_env("RATE_LIMIT_SWEEP_CRON"),

            // Server
            port: parse_env("PORT", 8080u16)?,
        })
    }
}

/// Read a variable that is treated as unset when empty.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(v) => v.parse().context(format!("Invalid {}: '{}'", key, v)),
        None => Ok(default),
    }
}
